use tagger_core::pipeline::{ACCESS_TOKEN_ENV, API_KEY_ENV};

pub fn instructions() -> String {
    format!(
        r#"Google Cloud Vision setup

Using the Google Cloud Console
- Create a project at https://console.cloud.google.com/
- Under "APIs & Services" > "Library", enable the Cloud Vision API.
  This requires a linked billing account.
- Under "APIs & Services" > "Credentials", click "Create Credentials" > "API key".
  Restrict the key to the Cloud Vision API.
- Export the key before running image-tagger:
    export {api_key}="<your key>"

Using the gcloud CLI
- gcloud projects create YOUR_UNIQUE_PROJECT_ID
- gcloud config set project YOUR_UNIQUE_PROJECT_ID
- gcloud billing projects link YOUR_UNIQUE_PROJECT_ID --billing-account=YOUR_BILLING_ACCOUNT_ID
- gcloud services enable vision.googleapis.com
- Either create an API key (see above) or use a short-lived access token:
    export {token}="$(gcloud auth print-access-token)"

Both values can also be set in the config file under [vision] as
api_key / access_token, or through IMAGE_TAGGER__VISION__API_KEY.
"#,
        api_key = API_KEY_ENV,
        token = ACCESS_TOKEN_ENV,
    )
}

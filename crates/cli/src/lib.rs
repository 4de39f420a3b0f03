//! Presentation helpers for the `image-tagger` binary.
pub mod progress;
pub mod setup;

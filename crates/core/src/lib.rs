//! Core library: discovery, label retrieval, metadata writing, tagging sessions.

pub mod config;
pub mod discovery;
pub mod labels;
pub mod metadata;
pub mod pipeline;
pub mod session;

//! Core data model types for decoded multipart content.

pub mod part;

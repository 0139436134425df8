/// YAML and JSON documents holding license content.
pub mod document;

pub use document::{Format, LicenseDocument, LoadError, SaveError};

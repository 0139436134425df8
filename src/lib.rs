//! License content
//!
//! A value type describing the terms of a software license: who holds it,
//! who issued it, what it covers, when it is valid, and how many consumers it
//! permits. Content can be observed for changes, compared, fingerprinted, and
//! stored as YAML or JSON documents.

pub mod domain;
pub use domain::{
    ChangeListener, Config, DEFAULT_CONSUMER_AMOUNT, Extra, LicenseContent, ListenerId,
    ObservedContent, Principal, PrincipalError, Property, PropertyChange, PropertyError,
    PropertyValue, ValueKind,
};

/// Filesystem storage for license content.
pub mod storage;
pub use storage::{Format, LicenseDocument, LoadError, SaveError};

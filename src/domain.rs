//! Domain models for license content.
//!
//! This module contains the license content value type, the principals it
//! names, its opaque extra payload, change notification, and configuration.

/// License content and its fingerprint.
pub mod content;
pub use content::{DEFAULT_CONSUMER_AMOUNT, LicenseContent};

/// Distinguished-name principals.
pub mod principal;
pub use principal::{Error as PrincipalError, Principal};

mod extra;
pub use extra::Extra;

pub mod property;
pub use property::{Property, PropertyError, PropertyValue, ValueKind};

pub mod observe;
pub use observe::{ChangeListener, ListenerId, ObservedContent, PropertyChange};

mod config;
pub use config::Config;

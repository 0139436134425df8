//! Names and dynamically typed values of the license content attributes.
//!
//! These types back change notification, comparison and the command line,
//! all of which need to refer to an attribute without knowing its static
//! type.

use std::{fmt, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::{Extra, Principal};

/// One of the ten attributes of a [`LicenseContent`](crate::LicenseContent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    /// The licensed legal entity.
    Holder,
    /// The granting legal entity.
    Issuer,
    /// What is licensed.
    Subject,
    /// When the license was created.
    Issued,
    /// Start of the validity window.
    NotBefore,
    /// End of the validity window.
    NotAfter,
    /// Category of consumer.
    ConsumerType,
    /// Maximum number of consumers.
    ConsumerAmount,
    /// Informational text.
    Info,
    /// Application-private payload.
    Extra,
}

impl Property {
    /// All properties, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Holder,
        Self::Issuer,
        Self::Subject,
        Self::Issued,
        Self::NotBefore,
        Self::NotAfter,
        Self::ConsumerType,
        Self::ConsumerAmount,
        Self::Info,
        Self::Extra,
    ];

    /// The property name as reported in change notifications and used as the
    /// key in persisted documents.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Holder => "holder",
            Self::Issuer => "issuer",
            Self::Subject => "subject",
            Self::Issued => "issued",
            Self::NotBefore => "notBefore",
            Self::NotAfter => "notAfter",
            Self::ConsumerType => "consumerType",
            Self::ConsumerAmount => "consumerAmount",
            Self::Info => "info",
            Self::Extra => "extra",
        }
    }

    /// The kind of [`PropertyValue`] this property holds.
    #[must_use]
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::Holder | Self::Issuer => ValueKind::Principal,
            Self::Subject | Self::ConsumerType | Self::Info => ValueKind::Text,
            Self::Issued | Self::NotBefore | Self::NotAfter => ValueKind::Timestamp,
            Self::ConsumerAmount => ValueKind::Integer,
            Self::Extra => ValueKind::Extra,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = PropertyError;

    /// Accepts `notBefore`, `not-before`, `not_before` and so on,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .collect::<String>()
            .to_lowercase();

        Self::ALL
            .into_iter()
            .find(|property| property.name().to_lowercase() == wanted)
            .ok_or_else(|| PropertyError::Unknown(s.to_string()))
    }
}

/// The kinds of value an attribute can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A distinguished-name identity.
    Principal,
    /// Free text.
    Text,
    /// A point in time.
    Timestamp,
    /// A signed integer.
    Integer,
    /// An opaque payload.
    Extra,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Principal => "a principal",
            Self::Text => "text",
            Self::Timestamp => "a timestamp",
            Self::Integer => "an integer",
            Self::Extra => "an extra payload",
        })
    }
}

/// The value of a single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Value of `holder` or `issuer`.
    Principal(Principal),
    /// Value of `subject`, `consumerType` or `info`.
    Text(String),
    /// Value of `issued`, `notBefore` or `notAfter`.
    Timestamp(DateTime<Utc>),
    /// Value of `consumerAmount`.
    Integer(i32),
    /// Value of `extra`.
    Extra(Extra),
}

impl PropertyValue {
    /// The kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Principal(_) => ValueKind::Principal,
            Self::Text(_) => ValueKind::Text,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::Integer(_) => ValueKind::Integer,
            Self::Extra(_) => ValueKind::Extra,
        }
    }

    pub(crate) fn into_principal(self) -> Result<Principal, Self> {
        match self {
            Self::Principal(principal) => Ok(principal),
            other => Err(other),
        }
    }

    pub(crate) fn into_text(self) -> Result<String, Self> {
        match self {
            Self::Text(text) => Ok(text),
            other => Err(other),
        }
    }

    pub(crate) fn into_timestamp(self) -> Result<DateTime<Utc>, Self> {
        match self {
            Self::Timestamp(timestamp) => Ok(timestamp),
            other => Err(other),
        }
    }

    pub(crate) fn into_integer(self) -> Result<i32, Self> {
        match self {
            Self::Integer(integer) => Ok(integer),
            other => Err(other),
        }
    }

    pub(crate) fn into_extra(self) -> Result<Extra, Self> {
        match self {
            Self::Extra(extra) => Ok(extra),
            other => Err(other),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Principal(principal) => write!(f, "{principal}"),
            Self::Text(text) => write!(f, "{text}"),
            Self::Timestamp(timestamp) => {
                write!(f, "{}", timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::Integer(integer) => write!(f, "{integer}"),
            Self::Extra(extra) => write!(f, "{extra}"),
        }
    }
}

impl From<Principal> for PropertyValue {
    fn from(value: Principal) -> Self {
        Self::Principal(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<Extra> for PropertyValue {
    fn from(value: Extra) -> Self {
        Self::Extra(value)
    }
}

/// Errors raised when addressing attributes by name or by dynamic value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PropertyError {
    /// No attribute has this name.
    #[error("Unknown property '{0}'")]
    Unknown(String),

    /// The value is of the wrong kind for the attribute.
    #[error("Property '{property}' expects {expected}, got {actual}")]
    Mismatch {
        /// The attribute being written.
        property: Property,
        /// The kind the attribute holds.
        expected: ValueKind,
        /// The kind that was supplied.
        actual: ValueKind,
    },
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Principal, content::DEFAULT_CONSUMER_AMOUNT, principal},
    storage::Format,
};

/// Configuration for creating license content.
///
/// Holds the defaults applied when new license content is created from the
/// command line, and the document format new files are written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Versions", into = "Versions")]
pub struct Config {
    /// The document format used when a file name has no recognised
    /// extension.
    pub format: Format,

    /// The issuer recorded in new license content, unless overridden.
    issuer: Option<Principal>,

    /// The consumer type recorded in new license content, unless overridden.
    pub consumer_type: Option<String>,

    /// The consumer amount recorded in new license content, unless
    /// overridden.
    pub consumer_amount: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: Format::default(),
            issuer: None,
            consumer_type: None,
            consumer_amount: default_consumer_amount(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the default issuer, if configured.
    #[must_use]
    pub const fn issuer(&self) -> Option<&Principal> {
        self.issuer.as_ref()
    }

    /// Sets the default issuer.
    pub fn set_issuer(&mut self, issuer: Option<Principal>) {
        self.issuer = issuer;
    }
}

const fn default_consumer_amount() -> i32 {
    DEFAULT_CONSUMER_AMOUNT
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        format: Format,

        /// The default issuer, as a distinguished name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        issuer: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        consumer_type: Option<String>,

        #[serde(default = "default_consumer_amount")]
        consumer_amount: i32,
    },
}

impl TryFrom<Versions> for Config {
    type Error = principal::Error;

    fn try_from(versions: Versions) -> Result<Self, Self::Error> {
        match versions {
            Versions::V1 {
                format,
                issuer,
                consumer_type,
                consumer_amount,
            } => Ok(Self {
                format,
                issuer: issuer.as_deref().map(Principal::new).transpose()?,
                consumer_type,
                consumer_amount,
            }),
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            format: config.format,
            issuer: config.issuer.as_ref().map(Principal::name),
            consumer_type: config.consumer_type,
            consumer_amount: config.consumer_amount,
        }
    }
}

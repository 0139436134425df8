use std::{
    fmt,
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Extra, LicenseContent, Principal, content::DEFAULT_CONSUMER_AMOUNT};

/// The text formats license content can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// YAML, the default.
    #[default]
    Yaml,
    /// JSON.
    Json,
}

impl Format {
    /// Infers the format from a file extension (`.yaml`, `.yml`, `.json`).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml") {
            Some(Self::Yaml)
        } else if extension.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        })
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown format '{other}': expected 'yaml' or 'json'")),
        }
    }
}

/// License content together with the format it is stored in.
///
/// This is the persistence side of [`LicenseContent`]. The stored record is
/// built from the content's public getters and turned back into content with
/// [`LicenseContent::new`] and the public setters only. Principals are stored
/// as their distinguished name and rebuilt from that name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseDocument {
    content: LicenseContent,
    format: Format,
}

impl LicenseDocument {
    /// Pairs content with a storage format.
    #[must_use]
    pub const fn new(content: LicenseContent, format: Format) -> Self {
        Self { content, format }
    }

    /// The stored content.
    #[must_use]
    pub const fn content(&self) -> &LicenseContent {
        &self.content
    }

    /// Unwraps the stored content.
    #[must_use]
    pub fn into_content(self) -> LicenseContent {
        self.content
    }

    /// The storage format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Writes the document to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be encoded or written.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), SaveError> {
        let record = Record::from(&self.content);
        match self.format {
            Format::Yaml => serde_yaml::to_writer(&mut *writer, &record)?,
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, &record)?;
                writer.write_all(b"\n")?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a document in the given format from `reader`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or is not a valid
    /// license content record.
    pub fn read<R: Read>(reader: R, format: Format) -> Result<Self, LoadError> {
        let record: Record = match format {
            Format::Yaml => serde_yaml::from_reader(reader)?,
            Format::Json => serde_json::from_reader(reader)?,
        };
        Ok(Self::new(record.into(), format))
    }

    /// Encodes the document as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be encoded.
    pub fn to_string(&self) -> Result<String, SaveError> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| SaveError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Decodes a document from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid license content record.
    pub fn from_str(input: &str, format: Format) -> Result<Self, LoadError> {
        Self::read(input.as_bytes(), format)
    }

    /// Writes the document to a file.
    ///
    /// Parent directories are created automatically if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save_to_path(&self, path: &Path) -> Result<(), SaveError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        tracing::debug!("Saved license content to {}", path.display());
        Ok(())
    }

    /// Reads a document from a file.
    ///
    /// The format is inferred from the file extension, falling back to
    /// `default_format`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be read, or does
    /// not contain a valid license content record.
    pub fn load(path: &Path, default_format: Format) -> Result<Self, LoadError> {
        let format = Format::from_path(path).unwrap_or(default_format);

        let file = File::open(path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(io_error),
        })?;

        let document = Self::read(BufReader::new(file), format)?;
        tracing::debug!("Loaded license content from {}", path.display());
        Ok(document)
    }
}

/// Errors that can occur when loading license content.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The license file was not found.
    #[error("license file not found")]
    NotFound,
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The YAML could not be parsed.
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The JSON could not be parsed.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur when saving license content.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The content could not be encoded as YAML.
    #[error("failed to encode YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The content could not be encoded as JSON.
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize an optional principal as its distinguished name.
///
/// # Errors
///
/// Returns an error if serialization fails.
#[allow(clippy::ref_option)]
pub fn principal_as_string<S>(
    principal: &Option<Principal>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match principal {
        Some(principal) => serializer.serialize_str(&principal.name()),
        None => serializer.serialize_none(),
    }
}

/// Deserialize an optional principal from its distinguished name.
///
/// This is the reconstruction rule for principals: the name string alone is
/// enough to rebuild an equal principal.
///
/// # Errors
///
/// Returns an error if the string is not a valid distinguished name.
pub fn principal_from_string<'de, D>(deserializer: D) -> Result<Option<Principal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|name| Principal::new(&name))
        .transpose()
        .map_err(serde::de::Error::custom)
}

/// A present `extra` key always yields a payload, even when it is `null`.
fn extra_from_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

const fn default_consumer_amount() -> i32 {
    DEFAULT_CONSUMER_AMOUNT
}

/// The serialized versions of license content.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Record {
    #[serde(rename = "1", rename_all = "camelCase")]
    V1 {
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            serialize_with = "principal_as_string",
            deserialize_with = "principal_from_string"
        )]
        holder: Option<Principal>,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            serialize_with = "principal_as_string",
            deserialize_with = "principal_from_string"
        )]
        issuer: Option<Principal>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        issued: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        not_before: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        not_after: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        consumer_type: Option<String>,
        #[serde(default = "default_consumer_amount")]
        consumer_amount: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        info: Option<String>,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "extra_from_value"
        )]
        extra: Option<Value>,
    },
}

impl From<&LicenseContent> for Record {
    fn from(content: &LicenseContent) -> Self {
        Self::V1 {
            holder: content.holder().cloned(),
            issuer: content.issuer().cloned(),
            subject: content.subject().map(str::to_string),
            issued: content.issued(),
            not_before: content.not_before(),
            not_after: content.not_after(),
            consumer_type: content.consumer_type().map(str::to_string),
            consumer_amount: content.consumer_amount(),
            info: content.info().map(str::to_string),
            extra: content.extra().map(|extra| extra.value().clone()),
        }
    }
}

impl From<Record> for LicenseContent {
    fn from(record: Record) -> Self {
        match record {
            Record::V1 {
                holder,
                issuer,
                subject,
                issued,
                not_before,
                not_after,
                consumer_type,
                consumer_amount,
                info,
                extra,
            } => {
                let mut content = Self::new();
                content.set_holder(holder);
                content.set_issuer(issuer);
                content.set_subject(subject);
                content.set_issued(issued);
                content.set_not_before(not_before);
                content.set_not_after(not_after);
                content.set_consumer_type(consumer_type);
                content.set_consumer_amount(consumer_amount);
                content.set_info(info);
                content.set_extra(extra.map(Extra::new));
                content
            }
        }
    }
}

use std::path::{Path, PathBuf};

mod compare;
mod fingerprint;
mod init;
mod new;
mod set;
mod show;
mod terminal;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::ArgAction;
use license_content::{Config, LicenseDocument, LoadError};

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the configuration file
    #[arg(short, long, default_value = "license.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        self.command.run(&self.config)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Write a default configuration file
    Init(init::Command),

    /// Create a new license content file
    New(new::Command),

    /// Print the content of a license file
    Show(show::Command),

    /// Set or clear a single property of a license file
    ///
    /// Property names are accepted in camelCase, kebab-case or snake_case,
    /// e.g. 'notAfter', 'not-after' or 'not_after'.
    Set(set::Command),

    /// Compare two license files
    ///
    /// Exits with status 1 if the files differ.
    Compare(compare::Command),

    /// Print the fingerprint of a license file
    Fingerprint(fingerprint::Command),
}

impl Command {
    fn run(self, config_path: &Path) -> anyhow::Result<()> {
        match self {
            Self::Init(command) => command.run(config_path),
            Self::New(command) => command.run(&load_config(config_path)?),
            Self::Show(command) => command.run(&load_config(config_path)?),
            Self::Set(command) => command.run(&load_config(config_path)?),
            Self::Compare(command) => command.run(&load_config(config_path)?),
            Self::Fingerprint(command) => command.run(&load_config(config_path)?),
        }
    }
}

/// Loads the configuration file, falling back to the defaults if it does not
/// exist.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    Config::load(path).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
}

/// Loads a license file, attaching the path to any error.
fn load_document(path: &Path, config: &Config) -> anyhow::Result<LicenseDocument> {
    LicenseDocument::load(path, config.format).map_err(|e| match e {
        LoadError::NotFound => anyhow::anyhow!("License file {} not found", path.display()),
        other => anyhow::Error::new(other)
            .context(format!("Failed to load license file {}", path.display())),
    })
}

/// Parse a timestamp given as RFC 3339, a plain date (midnight UTC), or
/// `now`.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if s.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(s) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
        .ok_or_else(|| format!("Invalid timestamp '{s}': expected RFC 3339, YYYY-MM-DD or 'now'"))
}

/// Parse an arbitrary JSON payload for the `extra` property.
fn parse_extra(s: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(s).map_err(|e| format!("Invalid JSON '{s}': {e}"))
}

/// Write a license file, refusing to overwrite unless forced.
fn save_document(document: &LicenseDocument, path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    document
        .save_to_path(path)
        .with_context(|| format!("Failed to write license file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use license_content::{Format, LicenseContent};
    use test_case::test_case;

    use super::*;

    #[test_case("2024-01-01T00:00:00Z", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(); "rfc3339 utc")]
    #[test_case("2024-06-30T12:00:00+02:00", Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap(); "rfc3339 offset")]
    #[test_case("2024-12-31", Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(); "plain date")]
    fn parses_timestamps(input: &str, expected: DateTime<Utc>) {
        assert_eq!(parse_timestamp(input).unwrap(), expected);
    }

    #[test]
    fn parses_now() {
        let before = Utc::now();
        let parsed = parse_timestamp("NOW").unwrap();
        assert!(parsed >= before);
    }

    #[test_case("tomorrow"; "word")]
    #[test_case("2024-13-01"; "bad month")]
    #[test_case(""; "empty")]
    fn rejects_bad_timestamps(input: &str) {
        assert!(parse_timestamp(input).is_err());
    }

    #[test]
    fn parses_extra() {
        assert_eq!(
            parse_extra(r#"{"seats": 3}"#).unwrap(),
            serde_json::json!({"seats": 3})
        );
        assert!(parse_extra("{").is_err());
    }

    #[test]
    fn missing_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config(&tmp.path().join("license.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn refuses_to_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("license.yaml");
        let document = LicenseDocument::new(LicenseContent::new(), Format::Yaml);

        save_document(&document, &path, false).unwrap();
        assert!(save_document(&document, &path, false).is_err());
        save_document(&document, &path, true).unwrap();
    }

    #[test]
    fn missing_license_file() {
        let tmp = tempfile::tempdir().unwrap();
        let error = load_document(&tmp.path().join("nope.yaml"), &Config::default()).unwrap_err();
        assert!(error.to_string().contains("not found"));
    }
}

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use license_content::{Config, Extra, Format, LicenseContent, LicenseDocument, Principal};
use tracing::instrument;

use super::{parse_extra, parse_timestamp, save_document, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The license file to create
    file: PathBuf,

    /// The licensed legal entity, as a distinguished name
    #[arg(long, value_parser = parse_principal)]
    holder: Option<Principal>,

    /// The granting legal entity, as a distinguished name
    ///
    /// Defaults to the issuer in the configuration file.
    #[arg(long, value_parser = parse_principal)]
    issuer: Option<Principal>,

    /// What is licensed
    #[arg(long)]
    subject: Option<String>,

    /// When the license was created (RFC 3339, YYYY-MM-DD or 'now')
    #[arg(long, value_parser = parse_timestamp)]
    issued: Option<DateTime<Utc>>,

    /// Start of the validity window
    #[arg(long, value_parser = parse_timestamp)]
    not_before: Option<DateTime<Utc>>,

    /// End of the validity window
    #[arg(long, value_parser = parse_timestamp)]
    not_after: Option<DateTime<Utc>>,

    /// Category of consumer, e.g. 'user' or 'device'
    #[arg(long)]
    consumer_type: Option<String>,

    /// Maximum number of consumers
    #[arg(long, allow_negative_numbers = true)]
    consumer_amount: Option<i32>,

    /// Informational text
    #[arg(long)]
    info: Option<String>,

    /// Application-private payload, as JSON
    #[arg(long, value_parser = parse_extra)]
    extra: Option<serde_json::Value>,

    /// The document format
    ///
    /// Defaults to the file extension, then to the configured format.
    #[arg(long)]
    format: Option<Format>,

    /// Overwrite an existing file
    #[arg(long, short)]
    force: bool,
}

fn parse_principal(s: &str) -> Result<Principal, String> {
    s.parse().map_err(|e| format!("{e}"))
}

impl Command {
    #[instrument]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let format = self
            .format
            .or_else(|| Format::from_path(&self.file))
            .unwrap_or(config.format);

        let content = self.content(config);
        tracing::info!("Creating license content: {content}");

        save_document(&LicenseDocument::new(content, format), &self.file, self.force)
            .with_context(|| format!("Failed to create {}", self.file.display()))?;

        println!(
            "{}",
            format!("✅ Created {} ({format})", self.file.display()).success()
        );
        Ok(())
    }

    fn content(&self, config: &Config) -> LicenseContent {
        let mut content = LicenseContent::new();
        content.set_holder(self.holder.clone());
        content.set_issuer(self.issuer.clone().or_else(|| config.issuer().cloned()));
        content.set_subject(self.subject.clone());
        content.set_issued(self.issued);
        content.set_not_before(self.not_before);
        content.set_not_after(self.not_after);
        content.set_consumer_type(
            self.consumer_type
                .clone()
                .or_else(|| config.consumer_type.clone()),
        );
        content.set_consumer_amount(self.consumer_amount.unwrap_or(config.consumer_amount));
        content.set_info(self.info.clone());
        content.set_extra(self.extra.clone().map(Extra::new));
        content
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        command: Command,
    }

    fn parse(args: &[&str]) -> Command {
        Harness::try_parse_from(std::iter::once("new").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn creates_file_from_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("license.json");
        let path_arg = path.to_str().unwrap();

        parse(&[
            path_arg,
            "--holder",
            "CN=Alice",
            "--not-before",
            "2024-01-01",
            "--not-after",
            "2024-12-31T23:59:59Z",
            "--consumer-amount",
            "5",
            "--extra",
            r#"{"tier": "gold"}"#,
        ])
        .run(&Config::default())
        .unwrap();

        let document = LicenseDocument::load(&path, Format::Yaml).unwrap();
        assert_eq!(document.format(), Format::Json);

        let content = document.content();
        assert_eq!(content.holder(), Some(&Principal::new("CN=Alice").unwrap()));
        assert_eq!(content.consumer_amount(), 5);
        assert_eq!(
            content.extra().map(Extra::value),
            Some(&serde_json::json!({"tier": "gold"}))
        );
    }

    #[test]
    fn config_fills_defaults() {
        let mut config = Config::default();
        config.set_issuer(Some(Principal::new("CN=Acme").unwrap()));
        config.consumer_type = Some("device".to_string());
        config.consumer_amount = 10;

        let content = parse(&["license.yaml", "--consumer-amount", "3"]).content(&config);

        assert_eq!(content.issuer(), Some(&Principal::new("CN=Acme").unwrap()));
        assert_eq!(content.consumer_type(), Some("device"));
        assert_eq!(content.consumer_amount(), 3);
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        config.set_issuer(Some(Principal::new("CN=Acme").unwrap()));

        let content = parse(&["license.yaml", "--issuer", "CN=Other"]).content(&config);

        assert_eq!(content.issuer(), Some(&Principal::new("CN=Other").unwrap()));
    }

    #[test]
    fn invalid_holder_is_rejected() {
        let result = Harness::try_parse_from(["new", "license.yaml", "--holder", "Alice"]);
        assert!(result.is_err());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("license.yaml");
        let path_arg = path.to_str().unwrap();

        parse(&[path_arg]).run(&Config::default()).unwrap();
        assert!(parse(&[path_arg]).run(&Config::default()).is_err());
        parse(&[path_arg, "--force"]).run(&Config::default()).unwrap();
    }
}

use std::path::PathBuf;

use license_content::{Config, Format, LicenseDocument, Property};
use tracing::instrument;

use super::{load_document, terminal::Colorize};

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Output {
    /// One property per line
    #[default]
    Pretty,
    /// A YAML document
    Yaml,
    /// A JSON document
    Json,
}

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The license file to show
    file: PathBuf,

    /// Output format
    #[arg(long, short, value_enum, default_value_t)]
    output: Output,
}

impl Command {
    #[instrument]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let document = load_document(&self.file, config)?;

        match self.output {
            Output::Pretty => print!("{}", pretty(&document)),
            Output::Yaml => print!(
                "{}",
                LicenseDocument::new(document.into_content(), Format::Yaml).to_string()?
            ),
            Output::Json => print!(
                "{}",
                LicenseDocument::new(document.into_content(), Format::Json).to_string()?
            ),
        }

        Ok(())
    }
}

/// Renders every property on its own line, marking absent ones.
fn pretty(document: &LicenseDocument) -> String {
    let content = document.content();
    let width = Property::ALL
        .iter()
        .map(|property| property.name().len())
        .max()
        .unwrap_or_default();

    let mut output = String::new();
    for property in Property::ALL {
        let name = format!("{:width$}", property.name());
        let value = content
            .get(property)
            .map_or_else(|| "(none)".dim(), |value| value.to_string());
        output.push_str(&format!("{}  {value}\n", name.info()));
    }
    output
}

#[cfg(test)]
mod tests {
    use license_content::{LicenseContent, Principal};

    use super::*;

    #[test]
    fn pretty_lists_every_property() {
        let mut content = LicenseContent::new();
        content.set_holder(Some(Principal::new("CN=Alice").unwrap()));
        let output = pretty(&LicenseDocument::new(content, Format::Yaml));

        assert_eq!(output.lines().count(), Property::ALL.len());
        assert!(output.contains("CN=Alice"));
        assert!(output.contains("(none)"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let command = Command {
            file: tmp.path().join("missing.yaml"),
            output: Output::Pretty,
        };
        assert!(command.run(&Config::default()).is_err());
    }
}

use std::path::PathBuf;

use license_content::{Config, LicenseContent, Property};
use tracing::instrument;

use super::{load_document, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The first license file
    a: PathBuf,

    /// The second license file
    b: PathBuf,
}

impl Command {
    #[instrument]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let a = load_document(&self.a, config)?.into_content();
        let b = load_document(&self.b, config)?.into_content();

        let differences = a.differences(&b);
        if differences.is_empty() {
            println!("{}", "equal".success());
            return Ok(());
        }

        tracing::info!("{} properties differ", differences.len());
        for line in describe(&a, &b, &differences) {
            println!("{line}");
        }

        std::process::exit(1);
    }
}

/// One line per differing property, showing both values.
fn describe(a: &LicenseContent, b: &LicenseContent, differences: &[Property]) -> Vec<String> {
    let show = |content: &LicenseContent, property| {
        content
            .get(property)
            .map_or_else(|| "(none)".to_string(), |value| value.to_string())
    };

    differences
        .iter()
        .map(|&property| {
            format!(
                "{}: {} ≠ {}",
                property.to_string().warning(),
                show(a, property),
                show(b, property)
            )
        })
        .collect()
}

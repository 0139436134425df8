use std::path::Path;

use license_content::Config;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
pub struct Command {}

impl Command {
    #[instrument]
    pub fn run(self, config_path: &Path) -> anyhow::Result<()> {
        if config_path.exists() {
            anyhow::bail!(
                "Configuration already exists (found {})",
                config_path.display()
            );
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", parent.display()))?;
        }

        Config::default()
            .save(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", config_path.display()))?;

        println!("Created {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("  lic new license.yaml --holder \"CN=Alice\" --subject \"Your Product\"");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("license.toml");

        Command {}.run(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn refuses_existing_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("license.toml");
        std::fs::write(&path, "").unwrap();

        assert!(Command {}.run(&path).is_err());
    }
}

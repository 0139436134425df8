use std::path::PathBuf;

use license_content::Config;
use tracing::instrument;

use super::load_document;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The license file to fingerprint
    file: PathBuf,
}

impl Command {
    #[instrument]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let content = load_document(&self.file, config)?.into_content();
        println!("{}", content.fingerprint());
        Ok(())
    }
}

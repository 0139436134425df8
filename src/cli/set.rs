use std::path::PathBuf;

use anyhow::Context;
use license_content::{
    Config, Extra, LicenseDocument, ObservedContent, Principal, Property, PropertyChange,
    PropertyValue, ValueKind,
};
use tracing::instrument;

use super::{load_document, parse_extra, parse_timestamp, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The license file to modify
    file: PathBuf,

    /// The property to set, e.g. 'subject' or 'not-after'
    property: Property,

    /// The new value; omit to clear the property
    ///
    /// Clearing 'consumerAmount' restores the default of 1.
    value: Option<String>,
}

impl Command {
    #[instrument]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let document = load_document(&self.file, config)?;
        let format = document.format();

        let value = self
            .value
            .as_deref()
            .map(|raw| parse_value(self.property, raw))
            .transpose()?;

        let mut content = ObservedContent::from(document.into_content());
        content.add_change_listener(report_change);
        content.set(self.property, value)?;

        LicenseDocument::new(content.into_inner(), format)
            .save_to_path(&self.file)
            .with_context(|| format!("Failed to write license file {}", self.file.display()))?;

        Ok(())
    }
}

fn report_change(change: &PropertyChange) {
    let describe = |value: Option<&PropertyValue>| {
        value.map_or_else(|| "(none)".to_string(), ToString::to_string)
    };
    let old_value = describe(change.old_value.as_ref());
    let new_value = describe(change.new_value.as_ref());

    tracing::info!(
        property = %change.property,
        old = %old_value,
        new = %new_value,
        "Property changed"
    );

    if change.old_value == change.new_value {
        println!("{}", format!("{} unchanged ({new_value})", change.property).dim());
    } else {
        println!(
            "{}",
            format!("✅ {}: {old_value} → {new_value}", change.property).success()
        );
    }
}

/// Interprets a command-line value according to the kind of the property.
fn parse_value(property: Property, raw: &str) -> anyhow::Result<PropertyValue> {
    let value: PropertyValue = match property.kind() {
        ValueKind::Principal => raw
            .parse::<Principal>()
            .with_context(|| format!("Invalid principal for '{property}'"))?
            .into(),
        ValueKind::Text => raw.into(),
        ValueKind::Timestamp => parse_timestamp(raw).map_err(anyhow::Error::msg)?.into(),
        ValueKind::Integer => raw
            .parse::<i32>()
            .with_context(|| format!("Invalid integer '{raw}' for '{property}'"))?
            .into(),
        ValueKind::Extra => Extra::new(parse_extra(raw).map_err(anyhow::Error::msg)?).into(),
    };
    Ok(value)
}

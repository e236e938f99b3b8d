use anyhow::{Context, Result};
use chrono::NaiveDate;
use dacforge_core::{embodied, simulation::settings::SimulationSettings};
use dacforge_schemas::{configuration::Configuration, file_formats::EmbodiedFile};
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::{debug, info, warn};

/// Contents of the YAML settings file. Every block is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub configuration: Configuration,
    pub simulation: SimulationSettings,
    /// YAML inventory of infrastructure items and sorbent batches. When set,
    /// weekly embodied charges are amortized from it instead of taken verbatim.
    pub embodied_file: Option<String>,
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "settings file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML from {}", path.display()))?;
        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }
}

/// Produces the configuration in force for the week containing a given date.
pub struct ConfigurationSource {
    base: Configuration,
    inventory: Option<EmbodiedFile>,
}

impl ConfigurationSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let inventory = match &settings.embodied_file {
            Some(path) => Some(load_embodied_file(Path::new(path))?),
            None => None,
        };
        Ok(Self {
            base: settings.configuration.clone(),
            inventory,
        })
    }

    pub fn on(&self, date: NaiveDate) -> Result<Configuration> {
        let Some(inventory) = &self.inventory else {
            return Ok(self.base.clone());
        };
        let breakdown = embodied::amortize(
            &inventory.infrastructure,
            &inventory.sorbent_batches,
            &self.base,
            date,
        )
        .with_context(|| format!("Failed to amortize embodied inventory for {}", date))?;
        for item in &breakdown.unpriced_items {
            warn!(item = %item, "inventory item has no embodied total or usable factor");
        }
        debug!(
            %date,
            infrastructure_kg = breakdown.infrastructure_weekly_kg,
            sorbent_kg = breakdown.sorbent_weekly_kg,
            total_kg = breakdown.weekly_total_kg(),
            "amortized weekly embodied charge"
        );
        Ok(breakdown.apply_to(&self.base))
    }
}

fn load_embodied_file(path: &Path) -> Result<EmbodiedFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read embodied inventory: {}", path.display()))?;
    let file: EmbodiedFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML from {}", path.display()))?;
    info!(
        path = %path.display(),
        schema_version = %file.schema_version,
        items = file.infrastructure.len(),
        batches = file.sorbent_batches.len(),
        "loaded embodied inventory"
    );
    Ok(file)
}

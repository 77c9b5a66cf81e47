use crate::features::DEFAULT_PROXIMITY_KM;
use crate::GeoscopeError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
pub struct GeoscopeConfig {
    #[serde(default)]
    pub disambiguation: DisambiguationConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisambiguationConfig {
    /// Linear scoring model JSON. Without one `disambiguate` needs `--model`, `--train` or `--baseline`.
    #[serde(default)]
    pub model: Option<PathBuf>,
    /// Radius for the context-support feature.
    #[serde(default = "default_proximity_km")]
    pub proximity_km: f64,
}

impl Default for DisambiguationConfig {
    fn default() -> Self {
        Self {
            model: None,
            proximity_km: default_proximity_km(),
        }
    }
}

fn default_proximity_km() -> f64 {
    DEFAULT_PROXIMITY_KM
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScopeConfig {
    #[serde(default)]
    pub strategy: ScopeStrategyKind,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScopeStrategyKind {
    #[default]
    Midpoint,
    Centroid,
}

/// Load config from `explicit` (flag or GEOSCOPE_CONFIG), ~/.geoscope/config.toml, or defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<GeoscopeConfig, GeoscopeError> {
    match config_path(explicit) {
        Some(p) if p.exists() => {
            let content = std::fs::read_to_string(&p)?;
            let config: GeoscopeConfig = toml::from_str(&content)
                .map_err(|e| GeoscopeError::Config(format!("{}: {e}", p.display())))?;
            validate_config(&config)?;
            log::debug!("loaded config from {}", p.display());
            Ok(config)
        }
        _ => Ok(GeoscopeConfig::default()),
    }
}

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    let home = std::env::var("HOME").ok()?;
    Some(Path::new(&home).join(".geoscope").join("config.toml"))
}

fn validate_config(config: &GeoscopeConfig) -> Result<(), GeoscopeError> {
    let km = config.disambiguation.proximity_km;
    if !km.is_finite() || km <= 0.0 {
        return Err(GeoscopeError::Config(format!(
            "disambiguation.proximity_km must be a positive number, got {km}"
        )));
    }
    Ok(())
}

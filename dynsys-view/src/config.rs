//! Configuration loading for dynsys-view
//!
//! Sources, highest priority first:
//! 1. `DYNSYS_VIEW_*` environment overrides, applied on top of any file
//! 2. `--config <path>` (or `DYNSYS_VIEW_CONFIG`)
//! 3. `.dynsys-view.{yaml,yml,json,toml}` in the current directory
//! 4. `~/.config/dynsys-view/config.{yaml,yml,json,toml}`
//! 5. Built-in defaults

use anyhow::{anyhow, Context, Result};
use dynsys_viewer::config::FocusMode;
use dynsys_viewer::{ComponentMapping, ScaleMode, ViewerConfig};
use log::{debug, info};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "DYNSYS_VIEW_";

/// Configuration loader with multiple source support
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper precedence
    pub fn load(explicit: Option<&Path>) -> Result<ViewerConfig> {
        Self::load_with(explicit, |key| env::var(key).ok())
    }

    /// `load` with the environment read through `lookup`.
    pub fn load_with<F>(explicit: Option<&Path>, lookup: F) -> Result<ViewerConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match explicit {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => Self::load_from_files()?,
        };
        apply_overrides(&mut config, lookup)?;
        Ok(config)
    }

    fn load_from_files() -> Result<ViewerConfig> {
        for path in Self::find_config_files() {
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(&path);
            }
        }
        debug!("No configuration file found, using defaults");
        Ok(ViewerConfig::default())
    }

    /// Candidate configuration files in search order
    pub fn find_config_files() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(config_path) = env::var("DYNSYS_VIEW_CONFIG") {
            paths.push(PathBuf::from(config_path));
        }

        if let Ok(current_dir) = env::current_dir() {
            for name in [
                ".dynsys-view.yaml",
                ".dynsys-view.yml",
                ".dynsys-view.json",
                ".dynsys-view.toml",
            ] {
                paths.push(current_dir.join(name));
            }
        }

        if let Some(config_dir) = dirs::home_dir().map(|h| h.join(".config").join("dynsys-view")) {
            for name in ["config.yaml", "config.yml", "config.json", "config.toml"] {
                paths.push(config_dir.join(name));
            }
        }

        paths
    }

    /// Load configuration from a specific file, picking the parser by extension
    pub fn load_from_file(path: &Path) -> Result<ViewerConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            _ => {
                if let Ok(config) = serde_yaml::from_str(&content) {
                    config
                } else if let Ok(config) = serde_json::from_str(&content) {
                    config
                } else {
                    return Err(anyhow!(
                        "Could not parse config file {} (tried YAML, JSON)",
                        path.display()
                    ));
                }
            }
        };
        Ok(config)
    }

    /// Save configuration to a file (YAML unless the extension says otherwise)
    pub fn save_to_file(config: &ViewerConfig, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(config)
                .context("Failed to serialize config to JSON")?,
            Some("toml") => {
                toml::to_string_pretty(config).context("Failed to serialize config to TOML")?
            }
            _ => serde_yaml::to_string(config).context("Failed to serialize config to YAML")?,
        };

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Sample configuration with every default spelled out
    pub fn generate_sample_config() -> Result<String> {
        serde_yaml::to_string(&ViewerConfig::default()).context("Failed to generate sample config")
    }
}

/// Apply `DYNSYS_VIEW_*` overrides read through `lookup`. Unparseable values
/// are errors rather than silently ignored.
pub fn apply_overrides<F>(config: &mut ViewerConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

    if let Some(mode) = get("SCALE_MODE") {
        config.normalizer.scale_mode = match mode.to_lowercase().as_str() {
            "isotropic" => ScaleMode::Isotropic,
            "anisotropic" => ScaleMode::Anisotropic,
            other => return Err(anyhow!("{ENV_PREFIX}SCALE_MODE: unknown mode '{other}'")),
        };
    }
    if let Some(extent) = get("TARGET_EXTENT") {
        config.normalizer.target_extent = parse_number(&extent, "TARGET_EXTENT")?;
    }
    if let Some(min) = get("MIN_TICKS") {
        config.ticks.min_ticks = parse_number(&min, "MIN_TICKS")?;
    }
    if let Some(max) = get("MAX_TICKS") {
        config.ticks.max_ticks = parse_number(&max, "MAX_TICKS")?;
    }
    if let Some(spacing) = get("TICK_SPACING_PX") {
        config.ticks.desired_spacing_px = parse_number(&spacing, "TICK_SPACING_PX")?;
    }
    if let Some(focus) = get("FOCUS") {
        config.camera.focus_mode = match focus.to_lowercase().replace('-', "_").as_str() {
            "origin" => FocusMode::Origin,
            "trajectory_center" | "center" => FocusMode::TrajectoryCenter,
            other => return Err(anyhow!("{ENV_PREFIX}FOCUS: unknown focus mode '{other}'")),
        };
    }
    if let Some(reset) = get("RESET_ON_PLOT") {
        config.camera.reset_on_plot = parse_flag(&reset, "RESET_ON_PLOT")?;
    }
    if let Some(grid) = get("SHOW_GRID") {
        config.axes.show_grid = parse_flag(&grid, "SHOW_GRID")?;
    }
    if let Some(mapping) = get("MAPPING") {
        config.mapping = parse_mapping(&mapping)?;
    }
    Ok(())
}

/// `"0,2,1"` style component mapping.
pub fn parse_mapping(s: &str) -> Result<ComponentMapping> {
    let slots = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<usize>()
                .with_context(|| format!("invalid mapping slot '{p}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    let slots: [usize; 3] = slots
        .try_into()
        .map_err(|v: Vec<usize>| anyhow!("mapping needs 3 slots, got {}", v.len()))?;
    Ok(ComponentMapping::new(slots)?)
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{ENV_PREFIX}{name}: invalid number '{value}'"))
}

fn parse_flag(value: &str, name: &str) -> Result<bool> {
    parse_bool(value).ok_or_else(|| anyhow!("{ENV_PREFIX}{name}: invalid boolean '{value}'"))
}

/// Parse a boolean value from string with various formats
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enable" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disable" | "disabled" => Some(false),
        "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_yaml_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".dynsys-view.yaml");

        let mut config = ViewerConfig::default();
        config.ticks.max_ticks = 12;
        config.normalizer.scale_mode = ScaleMode::Anisotropic;
        config.camera.initial_radius = Some(7.5);

        ConfigLoader::save_to_file(&config, &path).unwrap();
        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("viewer.json");

        let mut config = ViewerConfig::default();
        config.axes.axis_names[2] = "energy".to_string();
        ConfigLoader::save_to_file(&config, &path).unwrap();
        assert_eq!(ConfigLoader::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("viewer.toml");
        fs::write(
            &path,
            "mapping = [0, 2, 1]\n\n[ticks]\nmin_ticks = 4\n\n[camera]\nfocus_mode = \"trajectory_center\"\n",
        )
        .unwrap();

        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded.mapping, ComponentMapping([0, 2, 1]));
        assert_eq!(loaded.ticks.min_ticks, 4);
        assert_eq!(loaded.ticks.max_ticks, 15);
        assert_eq!(loaded.camera.focus_mode, FocusMode::TrajectoryCenter);
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = ViewerConfig::default();
        apply_overrides(
            &mut config,
            env_of(&[
                ("DYNSYS_VIEW_SCALE_MODE", "Anisotropic"),
                ("DYNSYS_VIEW_MAX_TICKS", "10"),
                ("DYNSYS_VIEW_FOCUS", "trajectory-center"),
                ("DYNSYS_VIEW_SHOW_GRID", "off"),
                ("DYNSYS_VIEW_MAPPING", "2, 0, 1"),
            ]),
        )
        .unwrap();

        assert_eq!(config.normalizer.scale_mode, ScaleMode::Anisotropic);
        assert_eq!(config.ticks.max_ticks, 10);
        assert_eq!(config.camera.focus_mode, FocusMode::TrajectoryCenter);
        assert!(!config.axes.show_grid);
        assert_eq!(config.mapping, ComponentMapping([2, 0, 1]));
    }

    #[test]
    fn test_environment_beats_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("viewer.yaml");
        let mut config = ViewerConfig::default();
        config.ticks.max_ticks = 12;
        config.ticks.min_ticks = 3;
        ConfigLoader::save_to_file(&config, &path).unwrap();

        let loaded =
            ConfigLoader::load_with(Some(&path), env_of(&[("DYNSYS_VIEW_MAX_TICKS", "10")]))
                .unwrap();
        assert_eq!(loaded.ticks.max_ticks, 10);
        assert_eq!(loaded.ticks.min_ticks, 3);

        let untouched = ConfigLoader::load_with(Some(&path), env_of(&[])).unwrap();
        assert_eq!(untouched.ticks.max_ticks, 12);
    }

    #[test]
    fn test_bad_overrides_are_reported() {
        let mut config = ViewerConfig::default();
        let err = apply_overrides(&mut config, env_of(&[("DYNSYS_VIEW_MIN_TICKS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("MIN_TICKS"));

        assert!(apply_overrides(&mut config, env_of(&[("DYNSYS_VIEW_MAPPING", "0,0,1")])).is_err());
        assert!(apply_overrides(&mut config, env_of(&[("DYNSYS_VIEW_MAPPING", "0,1")])).is_err());
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = ConfigLoader::generate_sample_config().unwrap();
        let parsed: ViewerConfig = serde_yaml::from_str(&sample).unwrap();
        assert_eq!(parsed, ViewerConfig::default());
    }

    #[test]
    fn test_bool_parsing() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("invalid"), None);
    }
}

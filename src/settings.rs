//! Program settings loaded from INI files.
//!
//! Settings provide defaults for every analysis; keys given in an input file
//! override them. Files are layered with the following precedence:
//!
//! 1. Local configuration (`./conezen_config.cfg`)
//! 2. User configuration (`~/.config/conezen/conezen_config.cfg`)
//! 3. System configuration (`/etc/conezen/conezen_config.cfg`)
//! 4. Built-in defaults
//!
//! Each layer only overrides the keys it actually sets.
//!
//! # Configuration File Format
//!
//! ```ini
//! [plot]
//! dpi = 300
//! fig_width = 10
//! fig_height = 8
//! elevation = 28
//! azimuth = -133
//!
//! [animation]
//! dpi = 200
//! fps = 20
//! rotation_step = 2
//!
//! [general]
//! energy_unit = hartree
//! print_level = 0
//!
//! [logging]
//! level = info
//! file_logging = false
//! ```

use crate::surface::EnergyUnit;
use configparser::ini::Ini;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Name of the settings file searched in every location
pub const SETTINGS_FILE_NAME: &str = "conezen_config.cfg";

/// Errors that can occur while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// All program settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Static figure defaults
    pub plot: PlotSettings,
    /// Animation defaults
    pub animation: AnimationSettings,
    /// General program settings
    pub general: GeneralSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Static figure defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSettings {
    /// Figure resolution (default: 300)
    pub dpi: u32,
    /// Figure width in inches (default: 10)
    pub fig_width: f64,
    /// Figure height in inches (default: 8)
    pub fig_height: f64,
    /// Camera elevation in degrees (default: 28)
    pub elevation: f64,
    /// Camera azimuth in degrees (default: -133)
    pub azimuth: f64,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            dpi: 300,
            fig_width: 10.0,
            fig_height: 8.0,
            elevation: 28.0,
            azimuth: -133.0,
        }
    }
}

/// Animation defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// Frame resolution (default: 200)
    pub dpi: u32,
    /// Frames per second (default: 20)
    pub fps: u32,
    /// Azimuth increment per frame in degrees (default: 2)
    pub rotation_step: f64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            dpi: 200,
            fps: 20,
            rotation_step: 2.0,
        }
    }
}

/// General program settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeneralSettings {
    /// Unit of reported energies (default: hartree)
    pub energy_unit: EnergyUnit,
    /// 0 = quiet, 1 = normal, 2 = verbose (default: 0)
    pub print_level: u32,
}

/// Logging configuration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level: debug, info, warn, error (default: "info")
    pub level: String,
    /// Write `conezen_debug_<base>.log` (default: false)
    pub file_logging: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
        }
    }
}

impl LoggingSettings {
    /// Parsed log level, `Info` for unrecognised names
    pub fn level_filter(&self) -> log::LevelFilter {
        log::LevelFilter::from_str(self.level.trim()).unwrap_or(log::LevelFilter::Info)
    }
}

/// Loads and holds the layered program settings.
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
    load_errors: Vec<String>,
}

impl SettingsManager {
    /// Loads settings from the standard locations.
    ///
    /// A file that fails to parse is skipped and recorded in
    /// [`load_errors`](Self::load_errors). Loading usually happens before a
    /// logger exists, so callers report those errors themselves.
    pub fn load() -> Self {
        let mut paths = Vec::new();
        if let Some(system) = Self::get_system_config_path() {
            paths.push(system);
        }
        if let Some(user) = Self::get_user_config_path() {
            paths.push(user);
        }
        paths.push(PathBuf::from(SETTINGS_FILE_NAME));
        Self::load_from_paths(&paths)
    }

    /// Layers the given files in order; later files override earlier ones.
    pub fn load_from_paths(paths: &[PathBuf]) -> Self {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();
        let mut load_errors = Vec::new();

        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_config(path, &settings) {
                Ok(layered) => {
                    settings = layered;
                    config_source = path.display().to_string();
                    debug!("Loaded settings from: {}", path.display());
                }
                Err(e) => {
                    warn!("Failed to load settings from {}: {}", path.display(), e);
                    load_errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        Self {
            settings,
            config_source,
            load_errors,
        }
    }

    /// Settings with built-in defaults only.
    pub fn defaults() -> Self {
        Self {
            settings: Settings::default(),
            config_source: "built-in defaults".to_string(),
            load_errors: Vec::new(),
        }
    }

    /// Files skipped while loading, as `"<path>: <error>"`.
    pub fn load_errors(&self) -> &[String] {
        &self.load_errors
    }

    /// Returns the last file that contributed, or "built-in defaults".
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Gets the general settings.
    pub fn general(&self) -> &GeneralSettings {
        &self.settings.general
    }

    /// Parses one INI file on top of `base`.
    fn load_config(path: &Path, base: &Settings) -> Result<Settings, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_settings(&content, base)
    }

    /// Parses INI text on top of `base`.
    pub fn parse_settings(content: &str, base: &Settings) -> Result<Settings, ConfigError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        let mut settings = base.clone();
        let map = ini.get_map_ref();

        if let Some(section) = map.get("plot") {
            let plot = &mut settings.plot;
            set_parsed(section, "dpi", &mut plot.dpi)?;
            set_parsed(section, "fig_width", &mut plot.fig_width)?;
            set_parsed(section, "fig_height", &mut plot.fig_height)?;
            set_parsed(section, "elevation", &mut plot.elevation)?;
            set_parsed(section, "azimuth", &mut plot.azimuth)?;
        }
        if let Some(section) = map.get("animation") {
            let anim = &mut settings.animation;
            set_parsed(section, "dpi", &mut anim.dpi)?;
            set_parsed(section, "fps", &mut anim.fps)?;
            set_parsed(section, "rotation_step", &mut anim.rotation_step)?;
        }
        if let Some(section) = map.get("general") {
            if let Some(Some(unit)) = section.get("energy_unit") {
                settings.general.energy_unit = unit.parse().map_err(ConfigError::InvalidValue)?;
            }
            set_parsed(section, "print_level", &mut settings.general.print_level)?;
        }
        if let Some(section) = map.get("logging") {
            if let Some(Some(level)) = section.get("level") {
                settings.logging.level = level.trim().to_string();
            }
            set_parsed(section, "file_logging", &mut settings.logging.file_logging)?;
        }

        Ok(settings)
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/conezen").join(SETTINGS_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("conezen").join(SETTINGS_FILE_NAME))
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("conezen")
                    .join(SETTINGS_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("conezen").join(SETTINGS_FILE_NAME))
        }
    }
}

/// Overwrites `target` when `key` is present in `section`.
fn set_parsed<T: FromStr>(
    section: &HashMap<String, Option<String>>,
    key: &str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(Some(raw)) = section.get(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("Invalid {}: {}", key, raw)))?;
    }
    Ok(())
}

impl SettingsManager {
    /// Writes a commented `conezen_config.cfg` with every option at its default.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        fs::write(path, Self::generate_template_content())?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    fn generate_template_content() -> String {
        let d = Settings::default();
        format!(
            r#"# ConeZen settings file
#
# Locations searched, highest priority first:
#
# 1. ./conezen_config.cfg
# 2. ~/.config/conezen/conezen_config.cfg
# 3. /etc/conezen/conezen_config.cfg
# 4. Built-in defaults
#
# Keys in an analysis input file override these values.

[plot]
# Figure resolution in dots per inch
dpi = {}
# Figure size in inches
fig_width = {}
fig_height = {}
# Camera angles in degrees
elevation = {}
azimuth = {}

[animation]
# Resolution of GIF frames
dpi = {}
# Frames per second
fps = {}
# Azimuth increment per frame in degrees (360 / step frames)
rotation_step = {}

[general]
# Energy unit for reports and plots: hartree or ev
energy_unit = {}
# 0 = quiet, 1 = normal, 2 = verbose
print_level = {}

[logging]
# Log level: debug, info, warn, error
level = {}
# Write conezen_debug_<input_basename>.log
file_logging = {}
"#,
            d.plot.dpi,
            d.plot.fig_width,
            d.plot.fig_height,
            d.plot.elevation,
            d.plot.azimuth,
            d.animation.dpi,
            d.animation.fps,
            d.animation.rotation_step,
            match d.general.energy_unit {
                EnergyUnit::Hartree => "hartree",
                EnergyUnit::ElectronVolt => "ev",
            },
            d.general.print_level,
            d.logging.level,
            d.logging.file_logging,
        )
    }
}

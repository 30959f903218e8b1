//! kicad-qr runtime configuration handling

use crate::error::{Error, Result};
use crate::placement::FitMode;
use crate::qr::EccLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure read from disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KicadQrConfig {
    /// Symbol generation options
    pub qr: QrOptions,
    /// Where and how the symbol lands on the board
    pub placement: PlacementOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl KicadQrConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No kicad-qr.toml / kicad-qr.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["kicad-qr.toml", "kicad-qr.yaml", "kicad-qr.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("kicad-qr");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        self.qr.apply_env_overrides();
        self.placement.apply_env_overrides();
        self.logging.apply_env_overrides();
    }
}

/// QR symbol options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QrOptions {
    /// Error-correction level
    pub ecc: EccLevel,
    /// Light modules added around the symbol
    pub border: usize,
    /// Scaling policy for non-square textboxes
    pub fit: FitMode,
    /// Draw one shape per horizontal run of dark modules instead of per module
    pub merge_runs: bool,
    /// Decode the generated symbol before touching the board
    pub verify: bool,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            ecc: EccLevel::L,
            border: 0,
            fit: FitMode::Contain,
            merge_runs: false,
            verify: false,
        }
    }
}

impl QrOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(ecc) = env::var("KICAD_QR_ECC") {
            if let Ok(parsed) = ecc.parse::<EccLevel>() {
                self.ecc = parsed;
            }
        }
        if let Ok(border) = env::var("KICAD_QR_BORDER") {
            if let Ok(parsed) = border.parse::<usize>() {
                self.border = parsed;
            }
        }
        if let Ok(fit) = env::var("KICAD_QR_FIT") {
            if let Ok(parsed) = fit.parse::<FitMode>() {
                self.fit = parsed;
            }
        }
        if let Some(merge) = env_flag("KICAD_QR_MERGE_RUNS") {
            self.merge_runs = merge;
        }
        if let Some(verify) = env_flag("KICAD_QR_VERIFY") {
            self.verify = verify;
        }
    }
}

/// Placement options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementOptions {
    /// Draw on this layer instead of the textbox's own layer
    pub layer: Option<String>,
    /// Leave the placeholder textbox on the board
    pub keep_textbox: bool,
}

impl PlacementOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(layer) = env::var("KICAD_QR_LAYER") {
            if layer.trim().is_empty() {
                self.layer = None;
            } else {
                self.layer = Some(layer);
            }
        }
        if let Some(keep) = env_flag("KICAD_QR_KEEP_TEXTBOX") {
            self.keep_textbox = keep;
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `KICAD_QR_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in terminal logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("KICAD_QR_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("KICAD_QR_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Some(color) = env_flag("KICAD_QR_LOG_COLOR") {
            self.color = color;
        }
        if let Ok(rotation) = env::var("KICAD_QR_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::parse(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    parse_flag(&value)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

//! linkqr runtime configuration handling

use crate::error::{Error, Result};
use crate::qr::{MAX_BORDER, MAX_IMAGE_SIDE, MAX_SCALE, MAX_VERSION, QrSettings, ec_level_name, parse_ec_level};
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration structure loaded from disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkqrConfig {
    /// QR rendering parameters
    pub qr: QrOptions,
    /// HTTP surface configuration
    pub server: ServerOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl LinkqrConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No linkqr.toml / linkqr.yaml found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["linkqr.toml", "linkqr.yaml", "linkqr.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("linkqr");
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

    /// Apply `LINKQR_*` overrides read through `lookup`. Unparsable values are ignored.
    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.qr.apply_overrides(&lookup);
        self.server.apply_overrides(&lookup);
        self.logging.apply_overrides(&lookup);
    }

    /// Validated encoder settings.
    pub fn qr_settings(&self) -> Result<QrSettings> {
        self.qr.to_settings()
    }
}

/// User-facing QR options, merged onto `QrSettings::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QrOptions {
    /// Smallest symbol version (1-40)
    pub min_version: i16,
    /// Error correction level name (L/M/Q/H)
    pub ec_level: String,
    /// Pixels per module
    pub scale: u32,
    /// Quiet-zone width in modules
    pub border: u32,
    /// Dark module color as `#RRGGBB`
    pub foreground: String,
    /// Light module color as `#RRGGBB`
    pub background: String,
    /// Decode every rendered symbol before returning it
    pub verify: bool,
}

impl Default for QrOptions {
    fn default() -> Self {
        let settings = QrSettings::default();
        Self {
            min_version: settings.min_version,
            ec_level: ec_level_name(settings.ec_level).to_string(),
            scale: settings.scale,
            border: settings.border,
            foreground: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
            verify: settings.verify,
        }
    }
}

impl QrOptions {
    pub(crate) fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(parsed) = lookup("LINKQR_QR_MIN_VERSION").and_then(|v| v.parse::<i16>().ok()) {
            self.min_version = parsed;
        }
        if let Some(level) = lookup("LINKQR_QR_EC_LEVEL") {
            self.ec_level = level;
        }
        if let Some(parsed) = lookup("LINKQR_QR_SCALE").and_then(|v| v.parse::<u32>().ok()) {
            self.scale = parsed;
        }
        if let Some(parsed) = lookup("LINKQR_QR_BORDER").and_then(|v| v.parse::<u32>().ok()) {
            self.border = parsed;
        }
        if let Some(color) = lookup("LINKQR_QR_FOREGROUND") {
            self.foreground = color;
        }
        if let Some(color) = lookup("LINKQR_QR_BACKGROUND") {
            self.background = color;
        }
        if let Some(parsed) = lookup("LINKQR_QR_VERIFY").as_deref().and_then(parse_flag) {
            self.verify = parsed;
        }
    }

    /// Validate and convert into encoder settings.
    pub fn to_settings(&self) -> Result<QrSettings> {
        if !(1..=MAX_VERSION).contains(&self.min_version) {
            return Err(Error::Config(format!(
                "QR min_version {} out of range, expected 1-{MAX_VERSION}",
                self.min_version
            )));
        }
        if !(1..=MAX_SCALE).contains(&self.scale) {
            return Err(Error::Config(format!(
                "QR scale {} out of range, expected 1-{MAX_SCALE}",
                self.scale
            )));
        }
        if self.border > MAX_BORDER {
            return Err(Error::Config(format!(
                "QR border {} out of range, expected 0-{MAX_BORDER}",
                self.border
            )));
        }
        let smallest = (17 + 4 * self.min_version as u32 + 2 * self.border) * self.scale;
        if smallest > MAX_IMAGE_SIDE {
            return Err(Error::Config(format!(
                "QR scale {} with border {} renders {smallest} px at version {}, above {MAX_IMAGE_SIDE} px",
                self.scale, self.border, self.min_version
            )));
        }

        let ec_level = parse_ec_level(&self.ec_level).ok_or_else(|| {
            Error::Config(format!(
                "Unknown error correction level '{}'. Use L, M, Q, or H",
                self.ec_level
            ))
        })?;

        Ok(QrSettings {
            min_version: self.min_version,
            ec_level,
            scale: self.scale,
            border: self.border,
            foreground: parse_color(&self.foreground)?,
            background: parse_color(&self.background)?,
            verify: self.verify,
        })
    }
}

/// Parse a `#RRGGBB` (or `RRGGBB`) color.
pub fn parse_color(value: &str) -> Result<Rgb<u8>> {
    let digits = value.trim().trim_start_matches('#');
    let mut rgb = [0u8; 3];
    hex::decode_to_slice(digits, &mut rgb)
        .map_err(|e| Error::Config(format!("Invalid color '{value}', expected #RRGGBB: {e}")))?;
    Ok(Rgb(rgb))
}

/// Smallest request body limit the server accepts.
pub const MIN_BODY_BYTES: usize = 1024;

/// HTTP surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Bind address for the HTTP server
    pub bind_address: String,
    /// Bind port for the HTTP server
    pub port: u16,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8501,
            max_body_bytes: 64 * 1024,
        }
    }
}

impl ServerOptions {
    pub(crate) fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("LINKQR_BIND_ADDRESS") {
            self.bind_address = addr;
        }
        if let Some(parsed) = lookup("LINKQR_BIND_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.port = parsed;
        }
        if let Some(parsed) = lookup("LINKQR_MAX_BODY_BYTES").and_then(|v| v.parse::<usize>().ok())
        {
            self.max_body_bytes = parsed.max(MIN_BODY_BYTES);
        }
    }

    /// Reject limits that would refuse every form submission.
    pub fn validate(&self) -> Result<()> {
        if self.max_body_bytes < MIN_BODY_BYTES {
            return Err(Error::Config(format!(
                "max_body_bytes {} is below the minimum of {MIN_BODY_BYTES}",
                self.max_body_bytes
            )));
        }
        Ok(())
    }

    /// Socket address helper for binding servers
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `LINKQR_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in stdout logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
    /// Emit periodic metrics summaries over tracing
    pub metrics: bool,
    /// Interval in seconds between metrics summaries
    pub metrics_interval_secs: u64,
    /// Output format for `GET /metrics`
    pub metrics_format: MetricsFormat,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
            rotation: None,
            metrics: false,
            metrics_interval_secs: 60,
            metrics_format: MetricsFormat::Json,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("LINKQR_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(file) = lookup("LINKQR_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Some(parsed) = lookup("LINKQR_LOG_COLOR").as_deref().and_then(parse_flag) {
            self.color = parsed;
        }
        if let Some(parsed) = lookup("LINKQR_LOG_ROTATION").and_then(|v| v.parse::<LogRotation>().ok()) {
            self.rotation = Some(parsed);
        }
        if let Some(parsed) = lookup("LINKQR_LOG_METRICS").as_deref().and_then(parse_flag) {
            self.metrics = parsed;
        }
        if let Some(value) = lookup("LINKQR_LOG_METRICS_INTERVAL").and_then(|v| v.parse::<u64>().ok()) {
            self.metrics_interval_secs = value.max(5);
        }
        if let Some(parsed) = lookup("LINKQR_METRICS_FORMAT").and_then(|v| v.parse::<MetricsFormat>().ok()) {
            self.metrics_format = parsed;
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
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

impl FromStr for LogRotation {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            _ => Err(format!(
                "Unsupported log rotation '{value}', expected 'hourly' or 'daily'"
            )),
        }
    }
}

/// Supported serialization formats for the metrics endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// Emit metrics as structured JSON
    Json,
    /// Emit metrics in Prometheus text exposition format
    Prometheus,
}

impl FromStr for MetricsFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "prometheus" => Ok(Self::Prometheus),
            _ => Err(format!(
                "Unsupported metrics format '{value}', expected 'json' or 'prometheus'"
            )),
        }
    }
}

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ServerError;

/// Which example application is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Models live under `native/<operation>/<model>`
    Machining,
    /// Models live under `native/<model>`
    SheetMetal,
}

impl Variant {
    pub const SHEET_METAL_PROFILE: &'static str = "sheet_metal";

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "machining" | "cnc" | "cnc_machining" => Some(Variant::Machining),
            "sheet_metal" | "sheet-metal" | "sheetmetal" => Some(Variant::SheetMetal),
            _ => None,
        }
    }

    pub fn page_title(self) -> &'static str {
        match self {
            Variant::Machining => "Manufacturing Toolkit - CNC Machining example",
            Variant::SheetMetal => "Manufacturing Toolkit - Sheet Metal example",
        }
    }

    /// Converter profile for an upload. Sheet metal ignores the requested operation.
    pub fn profile(self, requested: Option<&str>, default_operation: &str) -> String {
        match self {
            Variant::SheetMetal => Self::SHEET_METAL_PROFILE.to_string(),
            Variant::Machining => requested
                .map(str::trim)
                .filter(|op| !op.is_empty())
                .unwrap_or(default_operation)
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root of `upload/` and `native/`
    pub data_dir: PathBuf,
    pub converter: PathBuf,
    pub variant: Variant,
    pub default_operation: String,
    /// `None` waits for the converter indefinitely
    pub converter_timeout: Option<Duration>,
    /// Front-end assets served for unmatched paths
    pub static_dir: Option<PathBuf>,
    pub upload_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            data_dir: PathBuf::from("public/data/models"),
            converter: default_converter(),
            variant: Variant::Machining,
            default_operation: "machining_milling".to_string(),
            converter_timeout: None,
            static_dir: None,
            upload_limit: 256 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(addr) = get("MTK_BIND_ADDR") {
            config.bind_addr = addr
                .trim()
                .parse()
                .map_err(|e| ServerError::Config(format!("MTK_BIND_ADDR '{addr}': {e}")))?;
        }
        if let Some(dir) = get("MTK_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(exe) = get("MTK_CONVERTER") {
            config.converter = PathBuf::from(exe);
        }
        if let Some(variant) = get("MTK_VARIANT") {
            config.variant = Variant::parse(&variant)
                .ok_or_else(|| ServerError::Config(format!("MTK_VARIANT '{variant}' is not machining or sheet_metal")))?;
        }
        if let Some(op) = get("MTK_DEFAULT_OPERATION") {
            config.default_operation = op.trim().to_string();
        }
        if let Some(secs) = get("MTK_CONVERTER_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| ServerError::Config(format!("MTK_CONVERTER_TIMEOUT_SECS '{secs}': {e}")))?;
            config.converter_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(dir) = get("MTK_STATIC_DIR") {
            config.static_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join("upload")
    }

    pub fn native_dir(&self) -> PathBuf {
        self.data_dir.join("native")
    }

    /// Converter output directory for an uploaded file.
    pub fn output_dir(&self, profile: &str, file_name: &str) -> PathBuf {
        match self.variant {
            Variant::Machining => self.native_dir().join(profile).join(file_name),
            Variant::SheetMetal => self.native_dir().join(file_name),
        }
    }

    pub fn model_dir(&self, model_path: &Path) -> PathBuf {
        self.native_dir().join(model_path)
    }
}

fn default_converter() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("converter/MTKConverter.exe")
    } else {
        PathBuf::from("converter/MTKConverter")
    }
}

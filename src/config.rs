use pdffill_core::FillDefaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "PDFFILL_CONFIG";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// 新增字段与签名框的默认尺寸、字体
    pub defaults: FillDefaults,
    /// openssl 可执行文件
    pub openssl_path: PathBuf,
    /// 为签名预留的字节数
    pub signature_size: usize,
    /// 未指定 -v 且无 RUST_LOG 时的日志级别
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: FillDefaults::default(),
            openssl_path: PathBuf::from("openssl"),
            signature_size: 8192,
            log_level: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config dir unavailable")]
    NoConfigDir,
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// 查找顺序：命令行、环境变量、用户配置目录
fn resolve_path(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    let base = config_dir.ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("pdffill").join("config.json"))
}

pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    resolve_path(
        explicit,
        std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        dirs::config_dir(),
    )
}

/// 默认位置没有配置文件时返回默认值；显式指定的文件必须存在
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match config_path(explicit) {
        Ok(path) => path,
        Err(ConfigError::NoConfigDir) => return Ok(AppConfig::default()),
        Err(err) => return Err(err),
    };
    if explicit.is_none() && !path.exists() {
        return Ok(AppConfig::default());
    }
    read_config(&path)
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

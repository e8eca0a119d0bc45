use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod nginx;
pub mod retry;

pub use nginx::{CollectorConfig, NginxConfig};
pub use retry::RetryConfig;

/// 应用程序配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub nginx: NginxConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
}

impl Config {
    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| AppError::config(format!("解析配置文件失败: {}", e)))?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> AppResult<()> {
        if let Err(e) = self.nginx.validate() {
            return Err(AppError::config(format!("NGINX配置无效: {}", e)));
        }

        if let Err(e) = self.collector.validate() {
            return Err(AppError::config(format!("采集器配置无效: {}", e)));
        }

        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::config(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

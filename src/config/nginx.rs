use serde::{Deserialize, Serialize};

use crate::services::unix_socket::{UNIX_SOCKET_PREFIX, UnixSocketAddress};

/// NGINX 抓取目标配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NginxConfig {
    /// stub_status 页面或 Plus API 的地址，支持 http(s):// 与 unix:<path>[:<request-path>]
    pub scrape_uri: String,
    /// 是否为 NGINX Plus（决定创建哪种客户端）
    pub plus: bool,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
    /// 请求携带的 User-Agent
    pub user_agent: String,
}

impl Default for NginxConfig {
    fn default() -> Self {
        Self {
            scrape_uri: "http://127.0.0.1:8080/stub_status".to_string(),
            plus: false,
            timeout_secs: 5,
            user_agent: format!("NGINX-Prometheus-Exporter/v{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl NginxConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.scrape_uri.is_empty() {
            return Err("scrape_uri 不能为空".to_string());
        }

        if self.scrape_uri.starts_with(UNIX_SOCKET_PREFIX) {
            UnixSocketAddress::parse(&self.scrape_uri).map_err(|e| e.to_string())?;
        } else if !self.scrape_uri.starts_with("http://")
            && !self.scrape_uri.starts_with("https://")
        {
            return Err("scrape_uri 必须以 http://、https:// 或 unix: 开头".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("请求超时必须大于0".to_string());
        }

        Ok(())
    }

    /// 是否通过 unix 域套接字抓取
    pub fn is_unix_socket(&self) -> bool {
        self.scrape_uri.starts_with(UNIX_SOCKET_PREFIX)
    }
}

/// 采集器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// 指标名前缀
    pub namespace: String,
    /// 采集间隔（秒）
    pub scrape_interval_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            namespace: "nginx".to_string(),
            scrape_interval_secs: 15,
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.namespace.is_empty() {
            return Err("namespace 不能为空".to_string());
        }
        if self.scrape_interval_secs == 0 {
            return Err("采集间隔必须大于0".to_string());
        }
        Ok(())
    }
}

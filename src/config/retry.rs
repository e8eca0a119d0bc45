use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 客户端创建的重试配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 首次失败后的额外重试次数，0 表示只尝试一次
    pub retries: u32,
    /// 两次尝试之间的间隔（秒）
    pub retry_interval_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 0,
            retry_interval_secs: 5,
        }
    }
}

impl RetryConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.retries, 0);
        assert_eq!(config.retry_interval(), Duration::from_secs(5));
    }
}

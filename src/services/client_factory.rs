use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    config::{Config, NginxConfig},
    error::{AppError, AppResult},
    services::{plus_client::NginxPlusClient, stub_status::NginxClient, transport::build_transport},
};

/// 开源版或 Plus 版客户端
#[derive(Debug, Clone)]
pub enum NginxApiClient {
    Oss(NginxClient),
    Plus(NginxPlusClient),
}

impl NginxApiClient {
    /// 按 `plus` 开关创建对应的客户端，创建过程中会访问一次 NGINX
    pub async fn connect(config: &NginxConfig) -> AppResult<Self> {
        let (transport, endpoint) = build_transport(config)?;

        if config.plus {
            Ok(Self::Plus(NginxPlusClient::new(transport, &endpoint).await?))
        } else {
            Ok(Self::Oss(NginxClient::new(transport, &endpoint).await?))
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Oss(_) => "nginx",
            Self::Plus(_) => "nginx-plus",
        }
    }
}

/// 反复调用 `make` 直到成功，最多 `retries + 1` 次
///
/// 全部失败时返回 `RetryExhausted`，其中包含最后一次的错误。
pub async fn create_client_with_retries<F, Fut, T>(
    make: F,
    retries: u32,
    interval: Duration,
) -> AppResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        match make().await {
            Ok(client) => {
                if attempt > 1 {
                    info!("客户端在第 {} 次尝试后创建成功", attempt);
                }
                return Ok(client);
            }
            Err(e) => {
                if attempt >= max_attempts {
                    error!("创建客户端失败，已尝试 {} 次: {}", attempt, e);
                    return Err(AppError::RetryExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }

                warn!(
                    "第 {}/{} 次创建客户端失败: {}，{:?} 后重试",
                    attempt, max_attempts, e, interval
                );
                sleep(interval).await;
                attempt += 1;
            }
        }
    }
}

/// 按配置创建客户端，失败时按重试配置重试
pub async fn connect_with_retries(config: &Config) -> AppResult<NginxApiClient> {
    create_client_with_retries(
        || NginxApiClient::connect(&config.nginx),
        config.retry.retries,
        config.retry.retry_interval(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn flaky(calls: &AtomicU32, failures: u32) -> AppResult<&'static str> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            Err(AppError::transport("connection refused"))
        } else {
            Ok("client")
        }
    }

    #[tokio::test]
    async fn test_no_retries_single_attempt() {
        let calls = AtomicU32::new(0);
        let err = create_client_with_retries(|| flaky(&calls, 1), 0, Duration::from_secs(60))
            .await
            .unwrap_err();
        // retries 为 0 时不等待，直接失败
        assert!(matches!(err, AppError::RetryExhausted { attempts: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let calls = AtomicU32::new(0);
        let client = create_client_with_retries(|| flaky(&calls, 3), 3, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(client, "client");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let calls = AtomicU32::new(0);
        let err = create_client_with_retries(|| flaky(&calls, 10), 2, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            AppError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, AppError::Transport(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_selects_client_kind() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/stub_status")
            .with_status(200)
            .with_body("Active connections: 1 \nserver accepts handled requests\n 1 1 1 \nReading: 0 Writing: 1 Waiting: 0 \n")
            .create_async()
            .await;
        server
            .mock("GET", "/api")
            .with_status(200)
            .with_body("[1,2,3,4,5,6,7,8]")
            .create_async()
            .await;

        let mut config = NginxConfig {
            scrape_uri: format!("{}/stub_status", server.url()),
            ..Default::default()
        };
        let client = NginxApiClient::connect(&config).await.unwrap();
        assert_eq!(client.kind(), "nginx");

        config.scrape_uri = format!("{}/api", server.url());
        config.plus = true;
        let client = NginxApiClient::connect(&config).await.unwrap();
        assert_eq!(client.kind(), "nginx-plus");
    }

    #[tokio::test]
    async fn test_connect_with_retries_unsupported_version() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .with_status(200)
            .with_body("[1,2]")
            .expect(2)
            .create_async()
            .await;

        let mut config = Config::default();
        config.nginx.scrape_uri = format!("{}/api", server.url());
        config.nginx.plus = true;
        config.retry.retries = 1;
        config.retry.retry_interval_secs = 0;

        let err = connect_with_retries(&config).await.unwrap_err();
        match err {
            AppError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, AppError::UnsupportedVersion { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
        mock.assert_async().await;
    }
}

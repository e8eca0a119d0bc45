use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    error::{ApiError, AppError, AppResult},
    services::transport::{HttpRequest, HttpResponse, HttpTransport},
};

/// 客户端使用的 NGINX Plus API 版本
pub const API_VERSION: u32 = 5;

/// NGINX Plus API 的错误响应体
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    status: u16,
    #[serde(default)]
    text: String,
    #[serde(default)]
    code: String,
}

impl From<ApiErrorEnvelope> for ApiError {
    fn from(envelope: ApiErrorEnvelope) -> Self {
        ApiError {
            status: envelope.error.status,
            text: envelope.error.text,
            code: envelope.error.code,
            request_id: envelope.request_id,
            href: envelope.href,
        }
    }
}

/// 将非预期状态码的响应转换为错误，优先解析结构化错误体
fn unexpected_status(context: String, expected: u16, response: &HttpResponse) -> AppError {
    match serde_json::from_slice::<ApiErrorEnvelope>(&response.body) {
        Ok(envelope) => AppError::Api {
            context: format!(
                "{}: 期望响应码 {}，实际 {}",
                context, expected, response.status
            ),
            error: envelope.into(),
        },
        Err(_) => AppError::HttpStatus {
            context,
            expected,
            status: response.status,
            body: response.body_preview(),
        },
    }
}

/// 版本化的 NGINX Plus REST 客户端
///
/// 所有请求地址为 `{endpoint}/{version}/{path}`，每个操作都会校验响应码。
#[derive(Debug, Clone)]
pub struct RestClient {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    version: u32,
}

impl RestClient {
    /// 协商 API 版本后创建客户端
    pub async fn connect(transport: Arc<dyn HttpTransport>, endpoint: &str) -> AppResult<Self> {
        Self::connect_with_version(transport, endpoint, API_VERSION).await
    }

    pub async fn connect_with_version(
        transport: Arc<dyn HttpTransport>,
        endpoint: &str,
        version: u32,
    ) -> AppResult<Self> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let available = get_api_versions(transport.as_ref(), &endpoint).await?;

        if !available.contains(&version) {
            warn!(required = version, ?available, "NGINX Plus 不支持所需的 API 版本");
            return Err(AppError::UnsupportedVersion {
                required: version,
                available,
            });
        }

        info!(endpoint = %endpoint, version, "已连接 NGINX Plus API");
        Ok(Self {
            transport,
            endpoint,
            version,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            self.version,
            path.trim_start_matches('/')
        )
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        expected: u16,
    ) -> AppResult<HttpResponse> {
        let context = format!("{} {}", method, path);
        let mut request = HttpRequest::new(method, self.url(path));
        if let Some(body) = body {
            request = request.with_json_body(body);
        }

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| e.context(context.clone()))?;

        if response.status != expected {
            debug!(
                status = response.status,
                expected,
                preview = %response.body_preview(),
                "{} 响应码不符合预期",
                context
            );
            return Err(unexpected_status(context, expected, &response));
        }

        Ok(response)
    }

    /// GET 并解码 JSON，期望 200
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self.execute(Method::GET, path, None, 200).await?;
        serde_json::from_slice(&response.body).map_err(|e| {
            AppError::invalid_response(format!("GET {} 的响应无法解码: {}", path, e))
        })
    }

    /// POST JSON，期望 201
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> AppResult<()> {
        let body = serde_json::to_vec(body)?;
        self.execute(Method::POST, path, Some(body), 201).await?;
        Ok(())
    }

    /// PATCH JSON，响应码需等于 `expected`
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        expected: u16,
    ) -> AppResult<()> {
        let body = serde_json::to_vec(body)?;
        self.execute(Method::PATCH, path, Some(body), expected).await?;
        Ok(())
    }

    /// DELETE，响应码需等于 `expected`
    pub async fn delete(&self, path: &str, expected: u16) -> AppResult<()> {
        self.execute(Method::DELETE, path, None, expected).await?;
        Ok(())
    }
}

/// 读取 NGINX Plus 支持的 API 版本列表
pub async fn get_api_versions(
    transport: &dyn HttpTransport,
    endpoint: &str,
) -> AppResult<Vec<u32>> {
    let response = transport
        .send(HttpRequest::get(endpoint))
        .await
        .map_err(|e| e.context("获取 API 版本失败"))?;

    if response.status != 200 {
        return Err(unexpected_status(
            format!("GET {}", endpoint),
            200,
            &response,
        ));
    }

    serde_json::from_slice(&response.body).map_err(|e| {
        AppError::invalid_response(format!(
            "API 版本列表无法解码 ({}): {}",
            response.body_preview(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::transport::ReqwestTransport;
    use mockito::Server;
    use std::time::Duration;

    fn transport() -> Arc<dyn HttpTransport> {
        Arc::new(ReqwestTransport::new(Duration::from_secs(5), "test-agent").unwrap())
    }

    async fn connected(server: &mut Server) -> RestClient {
        server
            .mock("GET", "/api")
            .with_status(200)
            .with_body("[1,2,3,4,5,6]")
            .create_async()
            .await;
        RestClient::connect(transport(), &format!("{}/api", server.url()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_version_negotiation() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        assert_eq!(client.version(), API_VERSION);
        assert!(client.endpoint().ends_with("/api"));
    }

    #[tokio::test]
    async fn test_unsupported_version() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api")
            .with_status(200)
            .with_body("[1,2,3]")
            .create_async()
            .await;

        let err = RestClient::connect(transport(), &format!("{}/api", server.url()))
            .await
            .unwrap_err();
        match err {
            AppError::UnsupportedVersion {
                required,
                available,
            } => {
                assert_eq!(required, API_VERSION);
                assert_eq!(available, vec![1, 2, 3]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // 端口 1 上没有服务
        let err = RestClient::connect(transport(), "http://127.0.0.1:1/api")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[tokio::test]
    async fn test_get_decodes_json() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        server
            .mock("GET", "/api/5/connections")
            .with_status(200)
            .with_body(r#"{"accepted":10,"dropped":0,"active":2,"idle":1}"#)
            .create_async()
            .await;

        let value: serde_json::Value = client.get("connections").await.unwrap();
        assert_eq!(value["accepted"], 10);
    }

    #[tokio::test]
    async fn test_error_envelope_decoded() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        server
            .mock("GET", "/api/5/stream/upstreams")
            .with_status(404)
            .with_body(
                r#"{"error":{"status":404,"text":"path not found","code":"PathNotFound"},
                    "request_id":"f0e1","href":"https://nginx.org/en/docs/http/ngx_http_api_module.html"}"#,
            )
            .create_async()
            .await;

        let err = client
            .get::<serde_json::Value>("stream/upstreams")
            .await
            .unwrap_err();
        assert!(err.is_path_not_found());
        match err {
            AppError::Api { error, .. } => {
                assert_eq!(error.status, 404);
                assert_eq!(error.request_id.as_deref(), Some("f0e1"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_unexpected_status_without_envelope() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        server
            .mock("GET", "/api/5/nginx")
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let err = client.get::<serde_json::Value>("nginx").await.unwrap_err();
        match err {
            AppError::HttpStatus {
                expected,
                status,
                body,
                ..
            } => {
                assert_eq!(expected, 200);
                assert_eq!(status, 502);
                assert!(body.contains("bad gateway"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_mutating_requests_check_status() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;

        let post = server
            .mock("POST", "/api/5/http/keyvals/zone1")
            .match_body(mockito::Matcher::JsonString(r#"{"k":"v"}"#.to_string()))
            .with_status(201)
            .create_async()
            .await;
        server
            .mock("PATCH", "/api/5/http/keyvals/zone1")
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("DELETE", "/api/5/http/keyvals/zone1")
            .with_status(200)
            .create_async()
            .await;

        client
            .post("http/keyvals/zone1", &serde_json::json!({"k": "v"}))
            .await
            .unwrap();
        post.assert_async().await;

        client
            .patch("http/keyvals/zone1", &serde_json::json!({"k": "w"}), 204)
            .await
            .unwrap();

        // 期望 204 但返回 200
        let err = client.delete("http/keyvals/zone1", 204).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::HttpStatus {
                expected: 204,
                status: 200,
                ..
            }
        ));
    }
}

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use reqwest::{
    Client, Method,
    header::{CONTENT_TYPE, HOST, USER_AGENT},
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::net::UnixStream;
use tracing::debug;

use crate::{
    config::NginxConfig,
    error::{AppError, AppResult},
    services::unix_socket::{UNIX_SOCKET_HOST, UnixSocketAddress},
};

const JSON_CONTENT_TYPE: &str = "application/json";

/// 发往 NGINX 的单个 HTTP 请求
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// JSON 请求体
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new<T: Into<String>>(method: Method, url: T) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
        }
    }

    pub fn get<T: Into<String>>(url: T) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_json_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// NGINX 返回的原始响应
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    /// 截断后的响应体，用于错误信息
    pub fn body_preview(&self) -> String {
        String::from_utf8_lossy(&self.body).chars().take(200).collect()
    }
}

/// HTTP 传输层，负责在收到响应之前的所有环节（DNS、连接、超时）
#[async_trait]
pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: HttpRequest) -> AppResult<HttpResponse>;
}

/// 基于 reqwest 的 TCP 传输
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::config(format!("创建HTTP客户端失败: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self.client.request(request.method, &request.url);
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::transport(format!("请求 {} 失败: {}", request.url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::transport(format!("读取 {} 的响应失败: {}", request.url, e)))?;

        Ok(HttpResponse { status, body })
    }
}

/// 通过 unix 域套接字发送 HTTP/1.1 请求，每个请求单独建立连接
#[derive(Debug, Clone)]
pub struct UnixSocketTransport {
    socket_path: PathBuf,
    timeout: Duration,
    user_agent: String,
}

impl UnixSocketTransport {
    pub fn new(socket_path: PathBuf, timeout: Duration, user_agent: &str) -> Self {
        Self {
            socket_path,
            timeout,
            user_agent: user_agent.to_string(),
        }
    }

    async fn round_trip(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        let uri: hyper::Uri = request
            .url
            .parse()
            .map_err(|e| AppError::validation(format!("无效的请求地址 {}: {}", request.url, e)))?;
        let mut target = uri.path().to_string();
        if target.is_empty() {
            target.push('/');
        }
        if let Some(query) = uri.query() {
            target.push('?');
            target.push_str(query);
        }

        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            AppError::transport(format!(
                "连接 unix 套接字 {} 失败: {}",
                self.socket_path.display(),
                e
            ))
        })?;

        let (mut sender, connection) =
            hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream))
                .await
                .map_err(|e| AppError::transport(format!("HTTP 握手失败: {}", e)))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("unix 套接字连接结束: {}", e);
            }
        });

        let mut builder = hyper::Request::builder()
            .method(request.method)
            .uri(target)
            .header(HOST, UNIX_SOCKET_HOST)
            .header(USER_AGENT, self.user_agent.as_str());
        if request.body.is_some() {
            builder = builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        }
        let http_request = builder
            .body(Full::new(Bytes::from(request.body.unwrap_or_default())))
            .map_err(|e| AppError::transport(format!("构造请求失败: {}", e)))?;

        let response = sender
            .send_request(http_request)
            .await
            .map_err(|e| AppError::transport(format!("请求 {} 失败: {}", request.url, e)))?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| AppError::transport(format!("读取 {} 的响应失败: {}", request.url, e)))?
            .to_bytes();

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for UnixSocketTransport {
    async fn send(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        debug!(
            "{} {} (unix:{})",
            request.method,
            request.url,
            self.socket_path.display()
        );
        let url = request.url.clone();
        tokio::time::timeout(self.timeout, self.round_trip(request))
            .await
            .map_err(|_| AppError::transport(format!("请求 {} 超时 ({:?})", url, self.timeout)))?
    }
}

/// 根据抓取地址创建传输层，返回传输层与后续请求使用的基础 URL
pub fn build_transport(config: &NginxConfig) -> AppResult<(Arc<dyn HttpTransport>, String)> {
    let timeout = Duration::from_secs(config.timeout_secs);

    if config.is_unix_socket() {
        let address = UnixSocketAddress::parse(&config.scrape_uri)?;
        let endpoint = address.endpoint();
        let transport = UnixSocketTransport::new(address.socket_path, timeout, &config.user_agent);
        return Ok((Arc::new(transport), endpoint));
    }

    let transport = ReqwestTransport::new(timeout, &config.user_agent)?;
    Ok((Arc::new(transport), config.scrape_uri.clone()))
}

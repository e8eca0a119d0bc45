//! 测试用的内存版 NGINX Plus API

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde_json::json;
use std::{collections::HashMap, sync::Arc, sync::Mutex};

use crate::{
    error::AppResult,
    models::{LiveServer, SERVER_DEFAULTS, UpstreamServer},
    services::{
        plus_client::NginxPlusClient,
        transport::{HttpRequest, HttpResponse, HttpTransport},
    },
};

pub const FAKE_ENDPOINT: &str = "http://nginx/api";

#[derive(Debug, Default)]
struct FakeState {
    versions: Vec<u32>,
    /// 键为 "http/backend" 形式
    upstreams: HashMap<String, Vec<LiveServer>>,
    next_id: u64,
    routes: HashMap<(Method, String), (u16, String)>,
    failures: Vec<(Method, String)>,
    vanish_after_list: Option<String>,
    requests: Vec<(Method, String)>,
}

#[derive(Debug)]
pub struct FakeNginxPlus {
    state: Mutex<FakeState>,
}

fn json_response(status: u16, value: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status,
        body: Bytes::from(value.to_string()),
    }
}

pub fn error_body(status: u16, code: &str, text: &str) -> String {
    json!({
        "error": {"status": status, "text": text, "code": code},
        "request_id": "0123456789abcdef",
        "href": "https://nginx.org/en/docs/http/ngx_http_api_module.html"
    })
    .to_string()
}

fn error_response(status: u16, code: &str, text: &str) -> HttpResponse {
    HttpResponse {
        status,
        body: Bytes::from(error_body(status, code, text)),
    }
}

/// NGINX Plus 返回的服务器总是带上完整参数
fn fill_defaults(mut server: UpstreamServer) -> UpstreamServer {
    let d = &SERVER_DEFAULTS;
    server.max_conns.get_or_insert(d.max_conns);
    server.max_fails.get_or_insert(d.max_fails);
    server.fail_timeout.get_or_insert_with(|| d.fail_timeout.to_string());
    server.slow_start.get_or_insert_with(|| d.slow_start.to_string());
    server.route.get_or_insert_with(|| d.route.to_string());
    server.backup.get_or_insert(d.backup);
    server.down.get_or_insert(d.down);
    server.weight.get_or_insert(d.weight);
    server
}

fn merge(target: &mut UpstreamServer, patch: UpstreamServer) {
    if patch.max_conns.is_some() {
        target.max_conns = patch.max_conns;
    }
    if patch.max_fails.is_some() {
        target.max_fails = patch.max_fails;
    }
    if patch.fail_timeout.is_some() {
        target.fail_timeout = patch.fail_timeout;
    }
    if patch.slow_start.is_some() {
        target.slow_start = patch.slow_start;
    }
    if patch.route.is_some() {
        target.route = patch.route;
    }
    if patch.backup.is_some() {
        target.backup = patch.backup;
    }
    if patch.down.is_some() {
        target.down = patch.down;
    }
    if patch.drain.is_some() {
        target.drain = patch.drain;
    }
    if patch.weight.is_some() {
        target.weight = patch.weight;
    }
    if patch.service.is_some() {
        target.service = patch.service;
    }
}

impl FakeNginxPlus {
    pub fn new() -> Self {
        Self::with_versions(&[1, 2, 3, 4, 5, 6, 7, 8, 9])
    }

    pub fn with_versions(versions: &[u32]) -> Self {
        Self {
            state: Mutex::new(FakeState {
                versions: versions.to_vec(),
                ..Default::default()
            }),
        }
    }

    pub fn add_upstream(&self, key: &str, servers: &[UpstreamServer]) {
        let mut state = self.state.lock().unwrap();
        let mut live = Vec::new();
        for server in servers {
            state.next_id += 1;
            live.push(LiveServer {
                id: state.next_id,
                server: fill_defaults(server.clone()),
            });
        }
        state.upstreams.insert(key.to_string(), live);
    }

    pub fn set_route(&self, method: Method, path: &str, status: u16, body: &str) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert((method, path.to_string()), (status, body.to_string()));
    }

    /// 匹配方法与路径前缀的请求返回 502
    pub fn fail_on(&self, method: Method, path_prefix: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((method, path_prefix.to_string()));
    }

    /// 下一次列出服务器后立即移除该地址，模拟被外部删除
    pub fn vanish_after_list(&self, server: &str) {
        self.state.lock().unwrap().vanish_after_list = Some(server.to_string());
    }

    pub fn servers(&self, key: &str) -> Vec<LiveServer> {
        self.state
            .lock()
            .unwrap()
            .upstreams
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn mutating_requests(&self) -> Vec<(Method, String)> {
        self.requests()
            .into_iter()
            .filter(|(m, _)| *m != Method::GET)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }
}

impl FakeState {
    fn handle_upstream(
        &mut self,
        method: &Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> HttpResponse {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() < 4 || parts[1] != "upstreams" || parts[3] != "servers" {
            return error_response(404, "PathNotFound", "path not found");
        }

        let key = format!("{}/{}", parts[0], parts[2]);
        if !self.upstreams.contains_key(&key) {
            return error_response(404, "UpstreamNotFound", "upstream not found");
        }
        let id = parts.get(4).and_then(|s| s.parse::<u64>().ok());

        match (method.clone(), id) {
            (Method::GET, None) => {
                let servers = self.upstreams[&key].clone();
                if let Some(address) = self.vanish_after_list.take() {
                    if let Some(list) = self.upstreams.get_mut(&key) {
                        list.retain(|s| s.server.server != address);
                    }
                }
                json_response(200, serde_json::to_value(servers).unwrap())
            }
            (Method::POST, None) => {
                let server: UpstreamServer =
                    serde_json::from_slice(body.unwrap_or_default()).unwrap();
                self.next_id += 1;
                let live = LiveServer {
                    id: self.next_id,
                    server: fill_defaults(server),
                };
                if let Some(list) = self.upstreams.get_mut(&key) {
                    list.push(live.clone());
                }
                json_response(201, serde_json::to_value(live).unwrap())
            }
            (Method::PATCH, Some(id)) => {
                let patch: UpstreamServer =
                    serde_json::from_slice(body.unwrap_or_default()).unwrap();
                let list = self.upstreams.get_mut(&key).unwrap();
                match list.iter_mut().find(|s| s.id == id) {
                    Some(live) => {
                        merge(&mut live.server, patch);
                        json_response(200, serde_json::to_value(&*live).unwrap())
                    }
                    None => error_response(404, "UpstreamServerNotFound", "server not found"),
                }
            }
            (Method::DELETE, Some(id)) => {
                let list = self.upstreams.get_mut(&key).unwrap();
                let before = list.len();
                list.retain(|s| s.id != id);
                if list.len() == before {
                    return error_response(404, "UpstreamServerNotFound", "server not found");
                }
                json_response(200, serde_json::to_value(&*list).unwrap())
            }
            _ => error_response(405, "MethodDisabled", "method disabled"),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeNginxPlus {
    async fn send(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        let mut state = self.state.lock().unwrap();

        let rest = request
            .url
            .strip_prefix(FAKE_ENDPOINT)
            .unwrap_or(&request.url)
            .trim_start_matches('/');
        if rest.is_empty() {
            return Ok(json_response(200, json!(state.versions)));
        }
        let path = rest.split_once('/').map(|(_, p)| p).unwrap_or("").to_string();
        state.requests.push((request.method.clone(), path.clone()));

        if state
            .failures
            .iter()
            .any(|(m, p)| *m == request.method && path.starts_with(p.as_str()))
        {
            return Ok(error_response(502, "UpstreamBusy", "upstream is busy"));
        }

        if let Some((status, body)) = state.routes.get(&(request.method.clone(), path.clone())) {
            return Ok(HttpResponse {
                status: *status,
                body: Bytes::from(body.clone()),
            });
        }

        Ok(state.handle_upstream(&request.method, &path, request.body.as_deref()))
    }
}

/// 连接到内存 API 的客户端
pub async fn plus_client(fake: &Arc<FakeNginxPlus>) -> NginxPlusClient {
    let transport: Arc<dyn HttpTransport> = fake.clone();
    NginxPlusClient::new(transport, FAKE_ENDPOINT).await.unwrap()
}

/// 注册一套 http 侧统计接口，stream 侧由调用方决定
pub fn register_http_stats(fake: &FakeNginxPlus) {
    fake.set_route(
        Method::GET,
        "nginx",
        200,
        r#"{"version":"1.25.3","build":"nginx-plus-r31","address":"10.0.0.1","generation":2,
            "load_timestamp":"2024-01-01T00:00:00Z","timestamp":"2024-01-01T00:01:00Z","pid":42,"ppid":1}"#,
    );
    fake.set_route(
        Method::GET,
        "connections",
        200,
        r#"{"accepted":100,"dropped":1,"active":5,"idle":3}"#,
    );
    fake.set_route(Method::GET, "http/requests", 200, r#"{"total":900,"current":4}"#);
    fake.set_route(
        Method::GET,
        "ssl",
        200,
        r#"{"handshakes":50,"handshakes_failed":2,"session_reuses":10}"#,
    );
    fake.set_route(
        Method::GET,
        "http/server_zones",
        200,
        r#"{"site":{"processing":1,"requests":20,"responses":{"2xx":18,"4xx":2,"total":20}}}"#,
    );
    fake.set_route(
        Method::GET,
        "http/upstreams",
        200,
        r#"{"backend":{"zone":"backend","peers":[{"id":0,"server":"10.0.0.2:80","state":"up",
            "active":2,"requests":40,"fails":1,"unavail":0,"health_checks":{"fails":3}}]}}"#,
    );
    fake.set_route(Method::GET, "http/location_zones", 200, "{}");
    fake.set_route(Method::GET, "resolvers", 200, "{}");
}

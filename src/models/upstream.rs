use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 未指定端口时默认使用的端口
pub const DEFAULT_SERVER_PORT: &str = "80";

/// upstream 所在的配置上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamContext {
    Http,
    Stream,
}

impl UpstreamContext {
    /// API 路径前缀
    pub fn prefix(&self) -> &'static str {
        match self {
            UpstreamContext::Http => "http",
            UpstreamContext::Stream => "stream",
        }
    }
}

impl std::fmt::Display for UpstreamContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// upstream 服务器参数（期望状态）
///
/// 所有可选字段为 `None` 表示"未设置"，比较时统一按 [`SERVER_DEFAULTS`] 解析。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamServer {
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_conns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fails: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// NGINX Plus 中已生效的 upstream 服务器，ID 由 API 分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveServer {
    pub id: u64,
    #[serde(flatten)]
    pub server: UpstreamServer,
}

/// 服务器参数的默认值表
#[derive(Debug, Clone, Copy)]
pub struct ServerDefaults {
    pub max_conns: u32,
    pub max_fails: u32,
    pub fail_timeout: &'static str,
    pub slow_start: &'static str,
    pub route: &'static str,
    pub backup: bool,
    pub down: bool,
    pub drain: bool,
    pub weight: u32,
    pub service: &'static str,
}

/// NGINX Plus API 文档中的服务器参数默认值
pub const SERVER_DEFAULTS: ServerDefaults = ServerDefaults {
    max_conns: 0,
    max_fails: 1,
    fail_timeout: "10s",
    slow_start: "0s",
    route: "",
    backup: false,
    down: false,
    drain: false,
    weight: 1,
    service: "",
};

/// 按默认值解析后的完整参数集
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParams<'a> {
    pub max_conns: u32,
    pub max_fails: u32,
    pub fail_timeout: &'a str,
    pub slow_start: &'a str,
    pub route: &'a str,
    pub backup: bool,
    pub down: bool,
    pub drain: bool,
    pub weight: u32,
    pub service: &'a str,
}

fn non_empty<'a>(value: &'a Option<String>, default: &'static str) -> &'a str {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => default,
    }
}

impl UpstreamServer {
    pub fn new<T: Into<String>>(server: T) -> Self {
        Self {
            server: server.into(),
            ..Default::default()
        }
    }

    /// 用默认值表填充未设置的字段
    pub fn resolved(&self) -> ResolvedParams<'_> {
        let d = &SERVER_DEFAULTS;
        ResolvedParams {
            max_conns: self.max_conns.unwrap_or(d.max_conns),
            max_fails: self.max_fails.unwrap_or(d.max_fails),
            fail_timeout: non_empty(&self.fail_timeout, d.fail_timeout),
            slow_start: non_empty(&self.slow_start, d.slow_start),
            route: non_empty(&self.route, d.route),
            backup: self.backup.unwrap_or(d.backup),
            down: self.down.unwrap_or(d.down),
            drain: self.drain.unwrap_or(d.drain),
            weight: self.weight.unwrap_or(d.weight),
            service: non_empty(&self.service, d.service),
        }
    }

    /// 地址相同且解析默认值后参数完全一致
    pub fn has_same_parameters(&self, other: &UpstreamServer) -> bool {
        self.server == other.server && self.resolved() == other.resolved()
    }

    /// 返回补全默认端口后的副本
    pub fn with_default_port(mut self) -> Self {
        self.server = add_port_to_server(&self.server);
        self
    }

    /// 补全所有未设置的参数，更新请求以此作为请求体
    ///
    /// stream upstream 不支持 route 与 drain，这两项保持原样。
    pub fn with_defaults(mut self, context: UpstreamContext) -> Self {
        let d = &SERVER_DEFAULTS;
        self.max_conns.get_or_insert(d.max_conns);
        self.max_fails.get_or_insert(d.max_fails);
        self.fail_timeout.get_or_insert_with(|| d.fail_timeout.to_string());
        self.slow_start.get_or_insert_with(|| d.slow_start.to_string());
        self.backup.get_or_insert(d.backup);
        self.down.get_or_insert(d.down);
        self.weight.get_or_insert(d.weight);
        self.service.get_or_insert_with(|| d.service.to_string());
        if context == UpstreamContext::Http {
            self.route.get_or_insert_with(|| d.route.to_string());
            self.drain.get_or_insert(d.drain);
        }
        self
    }

    /// stream upstream 不支持 route 与 drain，取默认值时视为未设置
    pub fn validate_for(&self, context: UpstreamContext) -> Result<(), AppError> {
        if self.server.is_empty() {
            return Err(AppError::validation("服务器地址不能为空"));
        }
        let route_set = self.route.as_deref().is_some_and(|r| !r.is_empty());
        let drain_set = self.drain == Some(true);
        if context == UpstreamContext::Stream && (route_set || drain_set) {
            return Err(AppError::validation(format!(
                "stream upstream 服务器 {} 不支持 route/drain 参数",
                self.server
            )));
        }
        Ok(())
    }
}

/// 地址未带端口时补全默认端口 80
///
/// 已带端口、IPv6 `[addr]:port` 形式以及 `unix:` 地址保持不变。
pub fn add_port_to_server(server: &str) -> String {
    if server.split(':').count() == 2 {
        return server.to_string();
    }

    if server.split("]:").count() == 2 {
        return server.to_string();
    }

    if server.starts_with("unix:") {
        return server.to_string();
    }

    format!("{}:{}", server, DEFAULT_SERVER_PORT)
}

/// 期望状态与当前状态的差异
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerDiff {
    pub to_add: Vec<UpstreamServer>,
    pub to_delete: Vec<LiveServer>,
    /// 期望参数，携带匹配到的当前服务器 ID
    pub to_update: Vec<LiveServer>,
}

impl ServerDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty() && self.to_update.is_empty()
    }
}

/// 一次服务器集合同步的结果
///
/// 出错时 `error` 为第一个失败的请求，三个列表只包含出错前已成功应用的服务器。
#[derive(Debug, Default)]
pub struct UpdateOutcome {
    pub added: Vec<UpstreamServer>,
    pub deleted: Vec<LiveServer>,
    pub updated: Vec<LiveServer>,
    pub error: Option<AppError>,
}

impl UpdateOutcome {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.updated.is_empty()
    }
}

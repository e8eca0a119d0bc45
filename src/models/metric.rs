use serde::{Deserialize, Serialize};

/// 指标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// 指标表中的一项
pub trait Metric: Copy {
    /// 不含命名空间前缀的指标名
    fn name(&self) -> &'static str;
    fn help(&self) -> &'static str;
    fn kind(&self) -> MetricKind;
    /// 按响应码拆分的指标带有 `code` 标签
    fn code(&self) -> Option<&'static str> {
        None
    }
}

/// 一个带标签的采样值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub name: String,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl MetricSample {
    pub fn new(
        namespace: &str,
        name: &str,
        help: &'static str,
        kind: MetricKind,
        value: f64,
    ) -> Self {
        Self {
            name: format!("{}_{}", namespace, name),
            help,
            kind,
            labels: Vec::new(),
            value,
        }
    }

    /// 按指标表生成采样，带响应码的指标自动加上 `code` 标签
    pub fn of<M: Metric>(namespace: &str, metric: M, value: f64) -> Self {
        let sample = Self::new(namespace, metric.name(), metric.help(), metric.kind(), value);
        match metric.code() {
            Some(code) => sample.with_label("code", code),
            None => sample,
        }
    }

    pub fn with_label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

macro_rules! metric_table {
    (
        $(#[$meta:meta])*
        $table:ident {
            $($variant:ident => ($name:literal, $kind:ident, $code:expr, $help:literal),)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $table {
            $($variant,)+
        }

        impl $table {
            pub const ALL: &'static [$table] = &[$($table::$variant,)+];
        }

        impl Metric for $table {
            fn name(&self) -> &'static str {
                match self {
                    $($table::$variant => $name,)+
                }
            }

            fn help(&self) -> &'static str {
                match self {
                    $($table::$variant => $help,)+
                }
            }

            fn kind(&self) -> MetricKind {
                match self {
                    $($table::$variant => MetricKind::$kind,)+
                }
            }

            fn code(&self) -> Option<&'static str> {
                match self {
                    $($table::$variant => $code,)+
                }
            }
        }
    };
}

metric_table! {
    /// stub_status 指标
    StubMetric {
        ConnectionsActive => ("connections_active", Gauge, None, "Active client connections"),
        ConnectionsAccepted => (
            "connections_accepted",
            Counter,
            None,
            "Accepted client connections"
        ),
        ConnectionsHandled => ("connections_handled", Counter, None, "Handled client connections"),
        ConnectionsReading => (
            "connections_reading",
            Gauge,
            None,
            "Connections where NGINX is reading the request header"
        ),
        ConnectionsWriting => (
            "connections_writing",
            Gauge,
            None,
            "Connections where NGINX is writing the response back to the client"
        ),
        ConnectionsWaiting => ("connections_waiting", Gauge, None, "Idle client connections"),
        HttpRequestsTotal => ("http_requests_total", Counter, None, "Total http requests"),
    }
}

metric_table! {
    /// NGINX Plus 全局指标
    PlusMetric {
        ConnectionsAccepted => (
            "connections_accepted",
            Counter,
            None,
            "Accepted client connections"
        ),
        ConnectionsDropped => ("connections_dropped", Counter, None, "Dropped client connections"),
        ConnectionsActive => ("connections_active", Gauge, None, "Active client connections"),
        ConnectionsIdle => ("connections_idle", Gauge, None, "Idle client connections"),
        HttpRequestsTotal => ("http_requests_total", Counter, None, "Total http requests"),
        HttpRequestsCurrent => ("http_requests_current", Gauge, None, "Current http requests"),
        SslHandshakes => ("ssl_handshakes", Counter, None, "Successful SSL handshakes"),
        SslHandshakesFailed => ("ssl_handshakes_failed", Counter, None, "Failed SSL handshakes"),
        SslSessionReuses => (
            "ssl_session_reuses",
            Counter,
            None,
            "Session reuses during SSL handshake"
        ),
    }
}

metric_table! {
    /// http server zone 指标，标签为 server_zone
    ServerZoneMetric {
        Processing => (
            "server_zone_processing",
            Gauge,
            None,
            "Client requests that are currently being processed"
        ),
        Requests => ("server_zone_requests", Counter, None, "Total client requests"),
        Responses1xx => (
            "server_zone_responses",
            Counter,
            Some("1xx"),
            "Total responses sent to clients"
        ),
        Responses2xx => (
            "server_zone_responses",
            Counter,
            Some("2xx"),
            "Total responses sent to clients"
        ),
        Responses3xx => (
            "server_zone_responses",
            Counter,
            Some("3xx"),
            "Total responses sent to clients"
        ),
        Responses4xx => (
            "server_zone_responses",
            Counter,
            Some("4xx"),
            "Total responses sent to clients"
        ),
        Responses5xx => (
            "server_zone_responses",
            Counter,
            Some("5xx"),
            "Total responses sent to clients"
        ),
        Discarded => (
            "server_zone_discarded",
            Counter,
            None,
            "Requests completed without sending a response"
        ),
        Received => ("server_zone_received", Counter, None, "Bytes received from clients"),
        Sent => ("server_zone_sent", Counter, None, "Bytes sent to clients"),
    }
}

metric_table! {
    /// stream server zone 指标，标签为 server_zone
    StreamServerZoneMetric {
        Processing => (
            "stream_server_zone_processing",
            Gauge,
            None,
            "Client connections that are currently being processed"
        ),
        Connections => ("stream_server_zone_connections", Counter, None, "Total connections"),
        Sessions2xx => (
            "stream_server_zone_sessions",
            Counter,
            Some("2xx"),
            "Total sessions completed"
        ),
        Sessions4xx => (
            "stream_server_zone_sessions",
            Counter,
            Some("4xx"),
            "Total sessions completed"
        ),
        Sessions5xx => (
            "stream_server_zone_sessions",
            Counter,
            Some("5xx"),
            "Total sessions completed"
        ),
        Discarded => (
            "stream_server_zone_discarded",
            Counter,
            None,
            "Connections completed without creating a session"
        ),
        Received => ("stream_server_zone_received", Counter, None, "Bytes received from clients"),
        Sent => ("stream_server_zone_sent", Counter, None, "Bytes sent to clients"),
    }
}

metric_table! {
    /// http upstream 指标，标签为 upstream
    UpstreamMetric {
        Keepalives => ("upstream_keepalives", Gauge, None, "Idle keepalive connections"),
        Zombies => (
            "upstream_zombies",
            Gauge,
            None,
            "Servers removed from the group but still processing active client requests"
        ),
    }
}

metric_table! {
    /// http upstream peer 指标，标签为 upstream 与 server
    UpstreamServerMetric {
        State => ("upstream_server_state", Gauge, None, "Current state"),
        Active => ("upstream_server_active", Gauge, None, "Active connections"),
        Limit => (
            "upstream_server_limit",
            Gauge,
            None,
            "Limit for connections which corresponds to the max_conns parameter of the upstream server. Zero value means there is no limit"
        ),
        Requests => ("upstream_server_requests", Counter, None, "Total client requests"),
        Responses1xx => (
            "upstream_server_responses",
            Counter,
            Some("1xx"),
            "Total responses sent to clients"
        ),
        Responses2xx => (
            "upstream_server_responses",
            Counter,
            Some("2xx"),
            "Total responses sent to clients"
        ),
        Responses3xx => (
            "upstream_server_responses",
            Counter,
            Some("3xx"),
            "Total responses sent to clients"
        ),
        Responses4xx => (
            "upstream_server_responses",
            Counter,
            Some("4xx"),
            "Total responses sent to clients"
        ),
        Responses5xx => (
            "upstream_server_responses",
            Counter,
            Some("5xx"),
            "Total responses sent to clients"
        ),
        Sent => ("upstream_server_sent", Counter, None, "Bytes sent to this server"),
        Received => ("upstream_server_received", Counter, None, "Bytes received to this server"),
        Fails => (
            "upstream_server_fails",
            Counter,
            None,
            "Number of unsuccessful attempts to communicate with the server"
        ),
        Unavail => (
            "upstream_server_unavail",
            Counter,
            None,
            "How many times the server became unavailable for client requests (state 'unavail') due to the number of unsuccessful attempts reaching the max_fails threshold"
        ),
        HeaderTime => (
            "upstream_server_header_time",
            Gauge,
            None,
            "Average time to get the response header from the server"
        ),
        ResponseTime => (
            "upstream_server_response_time",
            Gauge,
            None,
            "Average time to get the full response from the server"
        ),
        HealthChecksChecks => (
            "upstream_server_health_checks_checks",
            Counter,
            None,
            "Total health check requests"
        ),
        HealthChecksFails => (
            "upstream_server_health_checks_fails",
            Counter,
            None,
            "Failed health checks"
        ),
        HealthChecksUnhealthy => (
            "upstream_server_health_checks_unhealthy",
            Counter,
            None,
            "How many times the server became unhealthy (state 'unhealthy')"
        ),
    }
}

metric_table! {
    /// stream upstream 指标，标签为 upstream
    StreamUpstreamMetric {
        Zombies => (
            "stream_upstream_zombies",
            Gauge,
            None,
            "Servers removed from the group but still processing active client connections"
        ),
    }
}

metric_table! {
    /// stream upstream peer 指标，标签为 upstream 与 server
    StreamUpstreamServerMetric {
        State => ("stream_upstream_server_state", Gauge, None, "Current state"),
        Active => ("stream_upstream_server_active", Gauge, None, "Active connections"),
        Limit => (
            "stream_upstream_server_limit",
            Gauge,
            None,
            "Limit for connections which corresponds to the max_conns parameter of the upstream server. Zero value means there is no limit"
        ),
        Connections => (
            "stream_upstream_server_connections",
            Counter,
            None,
            "Total number of client connections forwarded to this server"
        ),
        ConnectTime => (
            "stream_upstream_server_connect_time",
            Gauge,
            None,
            "Average time to connect to the upstream server"
        ),
        FirstByteTime => (
            "stream_upstream_server_first_byte_time",
            Gauge,
            None,
            "Average time to receive the first byte of data"
        ),
        ResponseTime => (
            "stream_upstream_server_response_time",
            Gauge,
            None,
            "Average time to receive the last byte of data"
        ),
        Sent => ("stream_upstream_server_sent", Counter, None, "Bytes sent to this server"),
        Received => (
            "stream_upstream_server_received",
            Counter,
            None,
            "Bytes received from this server"
        ),
        Fails => (
            "stream_upstream_server_fails",
            Counter,
            None,
            "Number of unsuccessful attempts to communicate with the server"
        ),
        Unavail => (
            "stream_upstream_server_unavail",
            Counter,
            None,
            "How many times the server became unavailable for client connections (state 'unavail') due to the number of unsuccessful attempts reaching the max_fails threshold"
        ),
        HealthChecksChecks => (
            "stream_upstream_server_health_checks_checks",
            Counter,
            None,
            "Total health check requests"
        ),
        HealthChecksFails => (
            "stream_upstream_server_health_checks_fails",
            Counter,
            None,
            "Failed health checks"
        ),
        HealthChecksUnhealthy => (
            "stream_upstream_server_health_checks_unhealthy",
            Counter,
            None,
            "How many times the server became unhealthy (state 'unhealthy')"
        ),
    }
}

metric_table! {
    /// 集群同步状态指标
    ZoneSyncMetric {
        BytesIn => (
            "stream_zone_sync_status_bytes_in",
            Counter,
            None,
            "Bytes received by this node"
        ),
        BytesOut => ("stream_zone_sync_status_bytes_out", Counter, None, "Bytes sent by this node"),
        MsgsIn => (
            "stream_zone_sync_status_msgs_in",
            Counter,
            None,
            "Total messages received by this node"
        ),
        MsgsOut => (
            "stream_zone_sync_status_msgs_out",
            Counter,
            None,
            "Total messages sent by this node"
        ),
        NodesOnline => (
            "stream_zone_sync_status_nodes_online",
            Gauge,
            None,
            "Number of peers this node is connected to"
        ),
    }
}

metric_table! {
    /// 单个同步共享内存区的指标，标签为 zone
    ZoneSyncZoneMetric {
        RecordsPending => (
            "stream_zone_sync_zone_records_pending",
            Gauge,
            None,
            "The number of records that need to be sent to the cluster"
        ),
        RecordsTotal => (
            "stream_zone_sync_zone_records_total",
            Gauge,
            None,
            "The total number of records stored in the shared memory zone"
        ),
    }
}

metric_table! {
    /// location zone 指标，标签为 location_zone
    LocationZoneMetric {
        Requests => ("location_zone_requests", Counter, None, "Total client requests"),
        Responses1xx => (
            "location_zone_responses",
            Counter,
            Some("1xx"),
            "Total responses sent to clients"
        ),
        Responses2xx => (
            "location_zone_responses",
            Counter,
            Some("2xx"),
            "Total responses sent to clients"
        ),
        Responses3xx => (
            "location_zone_responses",
            Counter,
            Some("3xx"),
            "Total responses sent to clients"
        ),
        Responses4xx => (
            "location_zone_responses",
            Counter,
            Some("4xx"),
            "Total responses sent to clients"
        ),
        Responses5xx => (
            "location_zone_responses",
            Counter,
            Some("5xx"),
            "Total responses sent to clients"
        ),
        Discarded => (
            "location_zone_discarded",
            Counter,
            None,
            "Requests completed without sending a response"
        ),
        Received => ("location_zone_received", Counter, None, "Bytes received from clients"),
        Sent => ("location_zone_sent", Counter, None, "Bytes sent to clients"),
    }
}

metric_table! {
    /// resolver 指标，标签为 resolver
    ResolverMetric {
        Name => ("resolver_name", Counter, None, "Total requests to resolve names to addresses"),
        Srv => ("resolver_srv", Counter, None, "Total requests to resolve SRV records"),
        Addr => ("resolver_addr", Counter, None, "Total requests to resolve addresses to names"),
        Noerror => ("resolver_noerror", Counter, None, "Total number of successful responses"),
        Formerr => ("resolver_formerr", Counter, None, "Total number of FORMERR responses"),
        Servfail => ("resolver_servfail", Counter, None, "Total number of SERVFAIL responses"),
        Nxdomain => ("resolver_nxdomain", Counter, None, "Total number of NXDOMAIN responses"),
        Notimp => ("resolver_notimp", Counter, None, "Total number of NOTIMP responses"),
        Refused => ("resolver_refused", Counter, None, "Total number of REFUSED responses"),
        Timedout => ("resolver_timedout", Counter, None, "Total number of timed out requests"),
        Unknown => (
            "resolver_unknown",
            Counter,
            None,
            "Total requests completed with an unknown error"
        ),
    }
}

/// peer 状态字符串到数值的映射
pub fn upstream_server_state_value(state: &str) -> f64 {
    match state {
        "up" => 1.0,
        "draining" => 2.0,
        "down" => 3.0,
        "unavail" => 4.0,
        "checking" => 5.0,
        "unhealthy" => 6.0,
        _ => 0.0,
    }
}

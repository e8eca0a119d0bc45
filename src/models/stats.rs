use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// NGINX Plus API 返回的统计快照
///
/// 每个子资源都是独立请求获得的，快照之间没有原子性保证。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub nginx_info: NginxInfo,
    pub connections: Connections,
    pub http_requests: HttpRequests,
    pub ssl: Ssl,
    pub server_zones: ServerZones,
    pub upstreams: Upstreams,
    pub stream_server_zones: StreamServerZones,
    pub stream_upstreams: StreamUpstreams,
    /// 未配置 zone_sync 时为 None
    pub stream_zone_sync: Option<StreamZoneSync>,
    pub location_zones: LocationZones,
    pub resolvers: Resolvers,
}

/// NGINX Plus 实例信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NginxInfo {
    pub version: String,
    pub build: String,
    pub address: String,
    pub generation: u64,
    pub load_timestamp: String,
    pub timestamp: String,
    pub pid: u64,
    pub ppid: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Connections {
    pub accepted: u64,
    pub dropped: u64,
    pub active: u64,
    pub idle: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpRequests {
    pub total: u64,
    pub current: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ssl {
    pub handshakes: u64,
    pub handshakes_failed: u64,
    pub session_reuses: u64,
}

pub type ServerZones = HashMap<String, ServerZone>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerZone {
    pub processing: u64,
    pub requests: u64,
    pub responses: Responses,
    pub discarded: u64,
    pub received: u64,
    pub sent: u64,
}

pub type StreamServerZones = HashMap<String, StreamServerZone>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamServerZone {
    pub processing: u64,
    pub connections: u64,
    pub sessions: Sessions,
    pub discarded: u64,
    pub received: u64,
    pub sent: u64,
}

/// 各共享内存区以及集群节点的同步状态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamZoneSync {
    pub zones: HashMap<String, SyncZone>,
    pub status: StreamZoneSyncStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncZone {
    pub records_pending: u64,
    pub records_total: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamZoneSyncStatus {
    pub bytes_in: u64,
    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_out: u64,
    pub nodes_online: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Responses {
    #[serde(rename = "1xx")]
    pub responses_1xx: u64,
    #[serde(rename = "2xx")]
    pub responses_2xx: u64,
    #[serde(rename = "3xx")]
    pub responses_3xx: u64,
    #[serde(rename = "4xx")]
    pub responses_4xx: u64,
    #[serde(rename = "5xx")]
    pub responses_5xx: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sessions {
    #[serde(rename = "2xx")]
    pub sessions_2xx: u64,
    #[serde(rename = "4xx")]
    pub sessions_4xx: u64,
    #[serde(rename = "5xx")]
    pub sessions_5xx: u64,
    pub total: u64,
}

pub type Upstreams = HashMap<String, Upstream>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Upstream {
    pub peers: Vec<Peer>,
    pub keepalives: u64,
    pub zombies: u64,
    pub zone: String,
    pub queue: Queue,
}

pub type StreamUpstreams = HashMap<String, StreamUpstream>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamUpstream {
    pub peers: Vec<StreamPeer>,
    pub zombies: u64,
    pub zone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Queue {
    pub size: u64,
    pub max_size: u64,
    pub overflows: u64,
}

/// upstream 中单个后端（peer）的运行统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Peer {
    pub id: u64,
    pub server: String,
    pub service: String,
    pub name: String,
    pub backup: bool,
    pub weight: u64,
    pub state: String,
    pub active: u64,
    pub max_conns: u64,
    pub requests: u64,
    pub responses: Responses,
    pub sent: u64,
    pub received: u64,
    pub fails: u64,
    pub unavail: u64,
    pub health_checks: HealthChecks,
    pub downtime: u64,
    pub downstart: String,
    pub selected: String,
    pub header_time: u64,
    pub response_time: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamPeer {
    pub id: u64,
    pub server: String,
    pub service: String,
    pub name: String,
    pub backup: bool,
    pub weight: u64,
    pub state: String,
    pub active: u64,
    pub max_conns: u64,
    pub connections: u64,
    pub connect_time: u64,
    pub first_byte_time: u64,
    pub response_time: u64,
    pub sent: u64,
    pub received: u64,
    pub fails: u64,
    pub unavail: u64,
    pub health_checks: HealthChecks,
    pub downtime: u64,
    pub downstart: String,
    pub selected: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthChecks {
    pub checks: u64,
    pub fails: u64,
    pub unhealthy: u64,
    pub last_passed: bool,
}

pub type LocationZones = HashMap<String, LocationZone>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationZone {
    pub requests: u64,
    pub responses: Responses,
    pub discarded: u64,
    pub received: u64,
    pub sent: u64,
}

pub type Resolvers = HashMap<String, Resolver>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resolver {
    pub requests: ResolverRequests,
    pub responses: ResolverResponses,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverRequests {
    pub name: u64,
    pub srv: u64,
    pub addr: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverResponses {
    pub noerror: u64,
    pub formerr: u64,
    pub servfail: u64,
    pub nxdomain: u64,
    pub notimp: u64,
    pub refused: u64,
    pub timedout: u64,
    pub unknown: u64,
}

/// key-value 共享内存区中的键值对
pub type KeyValPairs = HashMap<String, String>;

/// 按区名分组的键值对
pub type KeyValPairsByZone = HashMap<String, KeyValPairs>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_deserialize_with_missing_fields() {
        let upstreams: Upstreams = serde_json::from_str(
            r#"{"backend":{"peers":[{"id":0,"server":"10.0.0.1:80","state":"up",
                "responses":{"2xx":10,"total":12},"health_checks":{"checks":4,"last_passed":true}}],
                "zone":"backend"}}"#,
        )
        .unwrap();

        let backend = &upstreams["backend"];
        assert_eq!(backend.zone, "backend");
        assert_eq!(backend.peers.len(), 1);
        assert_eq!(backend.peers[0].responses.responses_2xx, 10);
        assert_eq!(backend.peers[0].responses.responses_5xx, 0);
        assert!(backend.peers[0].health_checks.last_passed);
        assert_eq!(backend.queue.size, 0);
    }

    #[test]
    fn test_zone_sync_deserialize() {
        let sync: StreamZoneSync = serde_json::from_str(
            r#"{"zones":{"zone1":{"records_pending":2,"records_total":7}},
                "status":{"bytes_in":1,"msgs_in":2,"msgs_out":3,"bytes_out":4,"nodes_online":2}}"#,
        )
        .unwrap();
        assert_eq!(sync.zones["zone1"].records_total, 7);
        assert_eq!(sync.status.nodes_online, 2);
    }
}

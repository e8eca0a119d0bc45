use serde::{Deserialize, Serialize};

/// stub_status 页面提供的计数器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubStats {
    pub connections: StubConnections,
    pub requests: u64,
}

/// 连接相关计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubConnections {
    pub active: u64,
    pub accepted: u64,
    pub handled: u64,
    pub reading: u64,
    pub writing: u64,
    pub waiting: u64,
}

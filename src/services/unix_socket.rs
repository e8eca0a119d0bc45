use std::path::PathBuf;

use crate::error::{AppError, AppResult};

pub const UNIX_SOCKET_PREFIX: &str = "unix:";

/// 通过 unix 域套接字访问时使用的虚拟主机名
pub const UNIX_SOCKET_HOST: &str = "unix";

/// `unix:<socket-path>[:<request-path>]` 形式的抓取地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnixSocketAddress {
    pub socket_path: PathBuf,
    pub request_path: String,
}

impl UnixSocketAddress {
    /// 解析 unix 域套接字地址，最多三段（前缀、套接字路径、可选请求路径）
    pub fn parse(address: &str) -> AppResult<Self> {
        let parts: Vec<&str> = address.split(':').collect();

        if parts.len() < 2 || parts.len() > 3 {
            return Err(AppError::validation(format!(
                "unix 域套接字地址格式错误: {}",
                address
            )));
        }

        if format!("{}:", parts[0]) != UNIX_SOCKET_PREFIX {
            return Err(AppError::validation(format!(
                "unix 域套接字地址必须以 {} 开头: {}",
                UNIX_SOCKET_PREFIX, address
            )));
        }

        if parts[1].is_empty() {
            return Err(AppError::validation(format!(
                "unix 域套接字路径不能为空: {}",
                address
            )));
        }

        let request_path = parts.get(2).map(|p| p.to_string()).unwrap_or_default();

        Ok(Self {
            socket_path: PathBuf::from(parts[1]),
            request_path,
        })
    }

    /// 后续 HTTP 请求使用的虚拟 URL
    pub fn endpoint(&self) -> String {
        format!("http://{}{}", UNIX_SOCKET_HOST, self.request_path)
    }
}

use std::sync::Arc;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    models::{StubConnections, StubStats},
    services::transport::{HttpRequest, HttpTransport},
};

const ACTIVE_CONNECTIONS_LABEL: &str = "Active connections:";
const STATE_LABELS: [&str; 3] = ["Reading:", "Writing:", "Waiting:"];

fn parse_number(token: &str, field: &str) -> AppResult<u64> {
    token
        .parse::<u64>()
        .map_err(|_| AppError::parse(format!("{} 的值 {:?} 不是非负整数", field, token)))
}

/// 解析 stub_status 页面
///
/// 页面固定为四行内容加结尾换行：
///
/// ```text
/// Active connections: 1457
/// server accepts handled requests
///  6717066 6717066 65844359
/// Reading: 1 Writing: 8 Waiting: 1448
/// ```
pub fn parse_stub_stats(text: &str) -> AppResult<StubStats> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() != 5 {
        return Err(AppError::parse(format!(
            "期望 4 个换行符，实际 {}",
            lines.len() - 1
        )));
    }
    if !lines[4].trim().is_empty() {
        return Err(AppError::parse("最后一个换行符之后存在多余内容"));
    }

    let active = lines[0]
        .trim()
        .strip_prefix(ACTIVE_CONNECTIONS_LABEL)
        .ok_or_else(|| AppError::parse(format!("第 1 行格式错误: {:?}", lines[0])))?;
    let active = parse_number(active.trim(), "active")?;

    let totals: Vec<&str> = lines[2].split_whitespace().collect();
    if totals.len() != 3 {
        return Err(AppError::parse(format!(
            "第 3 行应包含 3 个数字，实际 {} 个",
            totals.len()
        )));
    }
    let accepted = parse_number(totals[0], "accepted")?;
    let handled = parse_number(totals[1], "handled")?;
    let requests = parse_number(totals[2], "requests")?;

    let states: Vec<&str> = lines[3].split_whitespace().collect();
    if states.len() != 6 {
        return Err(AppError::parse(format!(
            "第 4 行应包含 6 个字段，实际 {} 个",
            states.len()
        )));
    }
    let mut values = [0u64; 3];
    for (i, label) in STATE_LABELS.iter().enumerate() {
        if states[i * 2] != *label {
            return Err(AppError::parse(format!(
                "第 4 行期望 {}，实际 {:?}",
                label,
                states[i * 2]
            )));
        }
        values[i] = parse_number(states[i * 2 + 1], label.trim_end_matches(':'))?;
    }

    Ok(StubStats {
        connections: StubConnections {
            active,
            accepted,
            handled,
            reading: values[0],
            writing: values[1],
            waiting: values[2],
        },
        requests,
    })
}

/// NGINX 开源版客户端，读取 stub_status 页面
#[derive(Debug, Clone)]
pub struct NginxClient {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
}

impl NginxClient {
    /// 创建客户端并立即抓取一次，确认地址可用
    pub async fn new(transport: Arc<dyn HttpTransport>, endpoint: &str) -> AppResult<Self> {
        let client = Self {
            transport,
            endpoint: endpoint.to_string(),
        };
        client.get_stub_stats().await?;
        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn get_stub_stats(&self) -> AppResult<StubStats> {
        let context = format!("GET {}", self.endpoint);
        let response = self
            .transport
            .send(HttpRequest::get(self.endpoint.as_str()))
            .await
            .map_err(|e| e.context(context.clone()))?;

        if response.status != 200 {
            return Err(AppError::HttpStatus {
                context,
                expected: 200,
                status: response.status,
                body: response.body_preview(),
            });
        }

        let text = std::str::from_utf8(&response.body)
            .map_err(|e| AppError::parse(format!("响应不是有效的 UTF-8: {}", e)))?;
        debug!(len = text.len(), "stub_status 响应长度");

        parse_stub_stats(text).map_err(|e| match e {
            AppError::Parse(msg) => AppError::parse(format!(
                "{}，响应内容: {:?}",
                msg,
                response.body_preview()
            )),
            other => other,
        })
    }
}

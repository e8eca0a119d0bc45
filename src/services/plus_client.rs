use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    models::{LiveServer, UpstreamContext, UpstreamServer},
    services::{rest_client::RestClient, transport::HttpTransport},
};

/// NGINX Plus API 客户端
#[derive(Debug, Clone)]
pub struct NginxPlusClient {
    pub(crate) rest: RestClient,
}

fn servers_path(context: UpstreamContext, upstream: &str) -> String {
    format!("{}/upstreams/{}/servers", context.prefix(), upstream)
}

fn server_path(context: UpstreamContext, upstream: &str, id: u64) -> String {
    format!("{}/{}", servers_path(context, upstream), id)
}

impl NginxPlusClient {
    /// 协商 API 版本后创建客户端
    pub async fn new(transport: Arc<dyn HttpTransport>, endpoint: &str) -> AppResult<Self> {
        let rest = RestClient::connect(transport, endpoint).await?;
        Ok(Self { rest })
    }

    pub fn version(&self) -> u32 {
        self.rest.version()
    }

    /// 获取 upstream 当前的服务器列表
    pub async fn get_servers(
        &self,
        context: UpstreamContext,
        upstream: &str,
    ) -> AppResult<Vec<LiveServer>> {
        self.rest
            .get(&servers_path(context, upstream))
            .await
            .map_err(|e| e.context(format!("获取 {} upstream {} 的服务器失败", context, upstream)))
    }

    /// 检查 upstream 是否存在
    pub async fn check_upstream_exists(
        &self,
        context: UpstreamContext,
        upstream: &str,
    ) -> AppResult<()> {
        self.get_servers(context, upstream).await.map(|_| ())
    }

    /// 按地址查找服务器 ID
    async fn find_server_id(
        &self,
        context: UpstreamContext,
        upstream: &str,
        server: &str,
    ) -> AppResult<Option<u64>> {
        let servers = self.get_servers(context, upstream).await?;
        Ok(servers
            .into_iter()
            .find(|s| s.server.server == server)
            .map(|s| s.id))
    }

    /// 添加服务器，地址已存在时返回 `ServerExists`
    pub async fn add_server(
        &self,
        context: UpstreamContext,
        upstream: &str,
        server: &UpstreamServer,
    ) -> AppResult<()> {
        server.validate_for(context)?;

        if self
            .find_server_id(context, upstream, &server.server)
            .await?
            .is_some()
        {
            return Err(AppError::ServerExists {
                upstream: upstream.to_string(),
                server: server.server.clone(),
            });
        }

        self.rest
            .post(&servers_path(context, upstream), server)
            .await
            .map_err(|e| {
                e.context(format!(
                    "添加服务器 {} 到 upstream {} 失败",
                    server.server, upstream
                ))
            })?;

        debug!(upstream, server = %server.server, "已添加服务器");
        Ok(())
    }

    /// 删除服务器，删除前重新解析地址对应的 ID，不存在时返回 `ServerNotFound`
    pub async fn delete_server(
        &self,
        context: UpstreamContext,
        upstream: &str,
        server: &str,
    ) -> AppResult<()> {
        let id = self
            .find_server_id(context, upstream, server)
            .await?
            .ok_or_else(|| AppError::ServerNotFound {
                upstream: upstream.to_string(),
                server: server.to_string(),
            })?;

        self.rest
            .delete(&server_path(context, upstream, id), 200)
            .await
            .map_err(|e| {
                e.context(format!("从 upstream {} 删除服务器 {} 失败", upstream, server))
            })?;

        debug!(upstream, server, id, "已删除服务器");
        Ok(())
    }

    /// 按 ID 更新服务器参数
    ///
    /// 未设置的参数按默认值发送，更新后服务器与比较时解析出的参数一致。
    pub async fn update_server(
        &self,
        context: UpstreamContext,
        upstream: &str,
        server: &LiveServer,
    ) -> AppResult<()> {
        server.server.validate_for(context)?;

        // 请求体只包含参数，不带 id
        let params = server.server.clone().with_defaults(context);
        self.rest
            .patch(&server_path(context, upstream, server.id), &params, 200)
            .await
            .map_err(|e| {
                e.context(format!(
                    "更新 upstream {} 的服务器 {} 失败",
                    upstream, server.server.server
                ))
            })?;

        info!(upstream, server = %server.server.server, id = server.id, "已更新服务器参数");
        Ok(())
    }
}

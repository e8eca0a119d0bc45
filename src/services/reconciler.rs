use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::{
    error::AppError,
    models::{LiveServer, ServerDiff, UpdateOutcome, UpstreamContext, UpstreamServer},
    services::plus_client::NginxPlusClient,
};

/// 补全默认端口，重复地址只保留第一次出现
pub fn normalize_servers(servers: &[UpstreamServer]) -> Vec<UpstreamServer> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(servers.len());

    for server in servers {
        let server = server.clone().with_default_port();
        if !seen.insert(server.server.clone()) {
            warn!(server = %server.server, "期望服务器列表中存在重复地址，已忽略");
            continue;
        }
        normalized.push(server);
    }

    normalized
}

/// 计算期望服务器集合与当前服务器集合的差异
///
/// `desired` 应已经过 [`normalize_servers`] 处理。
pub fn determine_updates(desired: &[UpstreamServer], live: &[LiveServer]) -> ServerDiff {
    let mut live_by_address: HashMap<&str, &LiveServer> = HashMap::new();
    for server in live {
        live_by_address
            .entry(server.server.server.as_str())
            .or_insert(server);
    }
    let desired_addresses: HashSet<&str> = desired.iter().map(|s| s.server.as_str()).collect();

    let mut diff = ServerDiff::default();

    for server in desired {
        match live_by_address.get(server.server.as_str()) {
            Some(current) => {
                if !server.has_same_parameters(&current.server) {
                    diff.to_update.push(LiveServer {
                        id: current.id,
                        server: server.clone(),
                    });
                }
            }
            None => diff.to_add.push(server.clone()),
        }
    }

    for server in live {
        if !desired_addresses.contains(server.server.server.as_str()) {
            diff.to_delete.push(server.clone());
        }
    }

    diff
}

impl NginxPlusClient {
    /// 将 upstream 的服务器集合同步为 `servers`
    ///
    /// 当前列表只获取一次，按新增、删除、更新的顺序逐个应用。遇到第一个错误即停止，
    /// 返回值中包含已成功应用的部分，不做回滚。
    pub async fn update_servers(
        &self,
        context: UpstreamContext,
        upstream: &str,
        servers: &[UpstreamServer],
    ) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();
        let failure =
            |e: AppError| e.context(format!("同步 {} upstream {} 失败", context, upstream));

        for server in servers {
            if let Err(e) = server.validate_for(context) {
                outcome.error = Some(failure(e));
                return outcome;
            }
        }

        let live = match self.get_servers(context, upstream).await {
            Ok(live) => live,
            Err(e) => {
                outcome.error = Some(failure(e));
                return outcome;
            }
        };

        let desired = normalize_servers(servers);
        let diff = determine_updates(&desired, &live);

        if diff.is_empty() {
            debug!(%context, upstream, "upstream 服务器无需变更");
            return outcome;
        }

        info!(
            %context,
            upstream,
            add = diff.to_add.len(),
            delete = diff.to_delete.len(),
            update = diff.to_update.len(),
            "开始同步 upstream 服务器"
        );

        for server in diff.to_add {
            if let Err(e) = self.add_server(context, upstream, &server).await {
                outcome.error = Some(failure(e));
                return outcome;
            }
            outcome.added.push(server);
        }

        for server in diff.to_delete {
            match self
                .delete_server(context, upstream, &server.server.server)
                .await
            {
                Ok(()) => outcome.deleted.push(server),
                Err(AppError::ServerNotFound { .. }) => {
                    warn!(upstream, server = %server.server.server, "服务器已不存在，跳过删除");
                }
                Err(e) => {
                    outcome.error = Some(failure(e));
                    return outcome;
                }
            }
        }

        for server in diff.to_update {
            if let Err(e) = self.update_server(context, upstream, &server).await {
                outcome.error = Some(failure(e));
                return outcome;
            }
            outcome.updated.push(server);
        }

        info!(
            %context,
            upstream,
            added = outcome.added.len(),
            deleted = outcome.deleted.len(),
            updated = outcome.updated.len(),
            "upstream 服务器同步完成"
        );
        outcome
    }

    pub async fn update_http_servers(
        &self,
        upstream: &str,
        servers: &[UpstreamServer],
    ) -> UpdateOutcome {
        self.update_servers(UpstreamContext::Http, upstream, servers)
            .await
    }

    pub async fn update_stream_servers(
        &self,
        upstream: &str,
        servers: &[UpstreamServer],
    ) -> UpdateOutcome {
        self.update_servers(UpstreamContext::Stream, upstream, servers)
            .await
    }
}

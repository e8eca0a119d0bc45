use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::AppResult,
    models::{
        Connections, HttpRequests, LocationZones, NginxInfo, Resolvers, ServerZones, Ssl, Stats,
        StreamServerZones, StreamUpstreams, StreamZoneSync, Upstreams,
    },
    services::plus_client::NginxPlusClient,
};

impl NginxPlusClient {
    async fn get_stat<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.rest
            .get(path)
            .await
            .map_err(|e| e.context(format!("获取统计信息 {} 失败", path)))
    }

    /// 未配置的子资源返回 PathNotFound，视为不存在
    async fn get_optional_stat<T: DeserializeOwned>(&self, path: &str) -> AppResult<Option<T>> {
        match self.rest.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_path_not_found() => {
                debug!(path, "子资源未配置");
                Ok(None)
            }
            Err(e) => Err(e.context(format!("获取统计信息 {} 失败", path))),
        }
    }

    pub async fn get_nginx_info(&self) -> AppResult<NginxInfo> {
        self.get_stat("nginx").await
    }

    pub async fn get_connections(&self) -> AppResult<Connections> {
        self.get_stat("connections").await
    }

    pub async fn get_http_requests(&self) -> AppResult<HttpRequests> {
        self.get_stat("http/requests").await
    }

    pub async fn get_ssl(&self) -> AppResult<Ssl> {
        self.get_stat("ssl").await
    }

    pub async fn get_server_zones(&self) -> AppResult<ServerZones> {
        self.get_stat("http/server_zones").await
    }

    pub async fn get_upstreams(&self) -> AppResult<Upstreams> {
        self.get_stat("http/upstreams").await
    }

    pub async fn get_stream_server_zones(&self) -> AppResult<StreamServerZones> {
        Ok(self
            .get_optional_stat("stream/server_zones")
            .await?
            .unwrap_or_default())
    }

    pub async fn get_stream_upstreams(&self) -> AppResult<StreamUpstreams> {
        Ok(self
            .get_optional_stat("stream/upstreams")
            .await?
            .unwrap_or_default())
    }

    pub async fn get_stream_zone_sync(&self) -> AppResult<Option<StreamZoneSync>> {
        self.get_optional_stat("stream/zone_sync").await
    }

    pub async fn get_location_zones(&self) -> AppResult<LocationZones> {
        self.get_stat("http/location_zones").await
    }

    pub async fn get_resolvers(&self) -> AppResult<Resolvers> {
        self.get_stat("resolvers").await
    }

    /// 依次读取所有子资源，任一非 PathNotFound 错误都会中止整个调用
    pub async fn get_stats(&self) -> AppResult<Stats> {
        Ok(Stats {
            nginx_info: self.get_nginx_info().await?,
            connections: self.get_connections().await?,
            http_requests: self.get_http_requests().await?,
            ssl: self.get_ssl().await?,
            server_zones: self.get_server_zones().await?,
            upstreams: self.get_upstreams().await?,
            stream_server_zones: self.get_stream_server_zones().await?,
            stream_upstreams: self.get_stream_upstreams().await?,
            stream_zone_sync: self.get_stream_zone_sync().await?,
            location_zones: self.get_location_zones().await?,
            resolvers: self.get_resolvers().await?,
        })
    }
}

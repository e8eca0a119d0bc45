use std::collections::HashMap;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    models::{KeyValPairs, KeyValPairsByZone, UpstreamContext},
    services::plus_client::NginxPlusClient,
};

fn keyvals_path(context: UpstreamContext, zone: &str) -> AppResult<String> {
    if zone.is_empty() {
        return Err(AppError::validation("keyval zone 不能为空"));
    }
    Ok(format!("{}/keyvals/{}", context.prefix(), zone))
}

/// keyval 共享内存区操作
impl NginxPlusClient {
    pub async fn get_key_vals(
        &self,
        context: UpstreamContext,
        zone: &str,
    ) -> AppResult<KeyValPairs> {
        let path = keyvals_path(context, zone)?;
        self.rest
            .get(&path)
            .await
            .map_err(|e| e.context(format!("获取 keyval zone {} 失败", zone)))
    }

    /// 获取所有 zone 的键值对
    pub async fn get_all_key_vals(&self, context: UpstreamContext) -> AppResult<KeyValPairsByZone> {
        self.rest
            .get(&format!("{}/keyvals", context.prefix()))
            .await
            .map_err(|e| e.context(format!("获取 {} keyval 失败", context)))
    }

    pub async fn add_key_val(
        &self,
        context: UpstreamContext,
        zone: &str,
        key: &str,
        value: &str,
    ) -> AppResult<()> {
        let path = keyvals_path(context, zone)?;
        let body = HashMap::from([(key, value)]);
        self.rest
            .post(&path, &body)
            .await
            .map_err(|e| e.context(format!("向 keyval zone {} 添加 {} 失败", zone, key)))?;
        debug!(zone, key, "已添加键值对");
        Ok(())
    }

    pub async fn modify_key_val(
        &self,
        context: UpstreamContext,
        zone: &str,
        key: &str,
        value: &str,
    ) -> AppResult<()> {
        let path = keyvals_path(context, zone)?;
        let body = HashMap::from([(key, value)]);
        self.rest
            .patch(&path, &body, 204)
            .await
            .map_err(|e| e.context(format!("修改 keyval zone {} 的 {} 失败", zone, key)))
    }

    /// 删除单个键，请求体中将该键置为 null
    pub async fn delete_key_val(
        &self,
        context: UpstreamContext,
        zone: &str,
        key: &str,
    ) -> AppResult<()> {
        let path = keyvals_path(context, zone)?;
        let body: HashMap<&str, Option<&str>> = HashMap::from([(key, None)]);
        self.rest
            .patch(&path, &body, 204)
            .await
            .map_err(|e| e.context(format!("删除 keyval zone {} 的 {} 失败", zone, key)))
    }

    /// 清空 zone 中的全部键值对
    pub async fn delete_key_vals(&self, context: UpstreamContext, zone: &str) -> AppResult<()> {
        let path = keyvals_path(context, zone)?;
        self.rest
            .delete(&path, 204)
            .await
            .map_err(|e| e.context(format!("清空 keyval zone {} 失败", zone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fake_nginx::{FakeNginxPlus, error_body, plus_client};
    use reqwest::Method;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_key_val_operations() {
        let fake = Arc::new(FakeNginxPlus::new());
        fake.set_route(Method::GET, "http/keyvals/zone_one", 200, r#"{"key1":"val1"}"#);
        fake.set_route(
            Method::GET,
            "stream/keyvals",
            200,
            r#"{"zone_one":{"key1":"val1"},"zone_two":{}}"#,
        );
        fake.set_route(Method::POST, "http/keyvals/zone_one", 201, "");
        fake.set_route(Method::PATCH, "http/keyvals/zone_one", 204, "");
        fake.set_route(Method::DELETE, "http/keyvals/zone_one", 204, "");
        let client = plus_client(&fake).await;

        let pairs = client.get_key_vals(UpstreamContext::Http, "zone_one").await.unwrap();
        assert_eq!(pairs.get("key1").map(String::as_str), Some("val1"));

        let all = client.get_all_key_vals(UpstreamContext::Stream).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all["zone_two"].is_empty());

        client.add_key_val(UpstreamContext::Http, "zone_one", "key2", "val2").await.unwrap();
        client.modify_key_val(UpstreamContext::Http, "zone_one", "key2", "val3").await.unwrap();
        client.delete_key_val(UpstreamContext::Http, "zone_one", "key2").await.unwrap();
        client.delete_key_vals(UpstreamContext::Http, "zone_one").await.unwrap();

        let methods: Vec<Method> = fake.mutating_requests().into_iter().map(|(m, _)| m).collect();
        assert_eq!(methods, vec![Method::POST, Method::PATCH, Method::PATCH, Method::DELETE]);
    }

    #[tokio::test]
    async fn test_key_val_errors() {
        let fake = Arc::new(FakeNginxPlus::new());
        fake.set_route(
            Method::POST,
            "http/keyvals/zone_one",
            409,
            &error_body(409, "KeyvalKeyExists", "key already exists"),
        );
        let client = plus_client(&fake).await;

        let err = client
            .add_key_val(UpstreamContext::Http, "zone_one", "key1", "val1")
            .await
            .unwrap_err();
        assert_eq!(err.api_code(), Some("KeyvalKeyExists"));

        let err = client.get_key_vals(UpstreamContext::Http, "").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(fake.requests().is_empty());
    }
}

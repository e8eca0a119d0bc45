/*
 * nginx-exporter - NGINX / NGINX Plus stats exporter
 * Copyright (c) 2024 nginx-exporter Project
 *
 * Licensed under the Apache License, Version 2.0
 * http://www.apache.org/licenses/LICENSE-2.0
 */

use nginx_exporter::{
    config::Config,
    error::AppResult,
    services::{NginxCollector, connect_with_retries},
};
use std::{path::Path, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_FILE: &str = "config.toml";

#[tokio::main]
async fn main() -> AppResult<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nginx_exporter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置，文件不存在时写出默认配置
    let config_path = Path::new(CONFIG_FILE);
    let config = if config_path.exists() {
        let config = Config::from_file(config_path)?;
        tracing::info!("已加载配置文件: {}", CONFIG_FILE);
        config
    } else {
        tracing::warn!("未找到配置文件，使用默认配置");
        let default_config = Config::default();
        if let Err(e) = default_config.save_to_file(config_path) {
            tracing::warn!("保存默认配置失败: {}", e);
        }
        default_config
    };
    config.validate()?;

    tracing::info!(
        "抓取地址: {} (plus: {})",
        config.nginx.scrape_uri,
        config.nginx.plus
    );

    let client = connect_with_retries(&config).await?;
    tracing::info!("{} 客户端创建成功", client.kind());

    let collector = NginxCollector::new(client, config.collector.namespace.clone());
    let mut ticker =
        tokio::time::interval(Duration::from_secs(config.collector.scrape_interval_secs));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("收到退出信号，停止采集");
                break;
            }
            _ = ticker.tick() => {
                let samples = collector.collect().await;
                let timestamp = chrono::Utc::now().to_rfc3339();
                for sample in &samples {
                    tracing::debug!(
                        name = %sample.name,
                        help = sample.help,
                        labels = ?sample.labels,
                        value = sample.value,
                        "指标"
                    );
                }
                tracing::info!("{} 采集到 {} 个指标", timestamp, samples.len());
            }
        }
    }

    Ok(())
}

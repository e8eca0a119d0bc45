use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::{
    models::{
        HealthChecks, LocationZone, LocationZoneMetric, MetricKind, MetricSample, Peer,
        PlusMetric, Resolver, ResolverMetric, ServerZone, ServerZoneMetric, Stats, StreamPeer,
        StreamServerZone, StreamServerZoneMetric, StreamUpstreamMetric,
        StreamUpstreamServerMetric, StreamZoneSync, StubMetric, StubStats, Upstream,
        UpstreamMetric, UpstreamServerMetric, ZoneSyncMetric, ZoneSyncZoneMetric,
        upstream_server_state_value,
    },
    services::client_factory::NginxApiClient,
};

const UP_HELP: &str = "Status of the last metric scrape";

/// 按名称排序，保证输出顺序稳定
fn sorted<V>(map: &HashMap<String, V>) -> Vec<(&str, &V)> {
    let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn stub_value(metric: StubMetric, stats: &StubStats) -> u64 {
    let c = &stats.connections;
    match metric {
        StubMetric::ConnectionsActive => c.active,
        StubMetric::ConnectionsAccepted => c.accepted,
        StubMetric::ConnectionsHandled => c.handled,
        StubMetric::ConnectionsReading => c.reading,
        StubMetric::ConnectionsWriting => c.writing,
        StubMetric::ConnectionsWaiting => c.waiting,
        StubMetric::HttpRequestsTotal => stats.requests,
    }
}

fn plus_value(metric: PlusMetric, stats: &Stats) -> u64 {
    match metric {
        PlusMetric::ConnectionsAccepted => stats.connections.accepted,
        PlusMetric::ConnectionsDropped => stats.connections.dropped,
        PlusMetric::ConnectionsActive => stats.connections.active,
        PlusMetric::ConnectionsIdle => stats.connections.idle,
        PlusMetric::HttpRequestsTotal => stats.http_requests.total,
        PlusMetric::HttpRequestsCurrent => stats.http_requests.current,
        PlusMetric::SslHandshakes => stats.ssl.handshakes,
        PlusMetric::SslHandshakesFailed => stats.ssl.handshakes_failed,
        PlusMetric::SslSessionReuses => stats.ssl.session_reuses,
    }
}

fn server_zone_value(metric: ServerZoneMetric, zone: &ServerZone) -> u64 {
    match metric {
        ServerZoneMetric::Processing => zone.processing,
        ServerZoneMetric::Requests => zone.requests,
        ServerZoneMetric::Responses1xx => zone.responses.responses_1xx,
        ServerZoneMetric::Responses2xx => zone.responses.responses_2xx,
        ServerZoneMetric::Responses3xx => zone.responses.responses_3xx,
        ServerZoneMetric::Responses4xx => zone.responses.responses_4xx,
        ServerZoneMetric::Responses5xx => zone.responses.responses_5xx,
        ServerZoneMetric::Discarded => zone.discarded,
        ServerZoneMetric::Received => zone.received,
        ServerZoneMetric::Sent => zone.sent,
    }
}

fn stream_server_zone_value(metric: StreamServerZoneMetric, zone: &StreamServerZone) -> u64 {
    match metric {
        StreamServerZoneMetric::Processing => zone.processing,
        StreamServerZoneMetric::Connections => zone.connections,
        StreamServerZoneMetric::Sessions2xx => zone.sessions.sessions_2xx,
        StreamServerZoneMetric::Sessions4xx => zone.sessions.sessions_4xx,
        StreamServerZoneMetric::Sessions5xx => zone.sessions.sessions_5xx,
        StreamServerZoneMetric::Discarded => zone.discarded,
        StreamServerZoneMetric::Received => zone.received,
        StreamServerZoneMetric::Sent => zone.sent,
    }
}

fn upstream_value(metric: UpstreamMetric, upstream: &Upstream) -> u64 {
    match metric {
        UpstreamMetric::Keepalives => upstream.keepalives,
        UpstreamMetric::Zombies => upstream.zombies,
    }
}

fn is_health_check(metric: UpstreamServerMetric) -> bool {
    matches!(
        metric,
        UpstreamServerMetric::HealthChecksChecks
            | UpstreamServerMetric::HealthChecksFails
            | UpstreamServerMetric::HealthChecksUnhealthy
    )
}

fn upstream_server_value(metric: UpstreamServerMetric, peer: &Peer) -> f64 {
    let value = match metric {
        UpstreamServerMetric::State => return upstream_server_state_value(&peer.state),
        UpstreamServerMetric::Active => peer.active,
        UpstreamServerMetric::Limit => peer.max_conns,
        UpstreamServerMetric::Requests => peer.requests,
        UpstreamServerMetric::Responses1xx => peer.responses.responses_1xx,
        UpstreamServerMetric::Responses2xx => peer.responses.responses_2xx,
        UpstreamServerMetric::Responses3xx => peer.responses.responses_3xx,
        UpstreamServerMetric::Responses4xx => peer.responses.responses_4xx,
        UpstreamServerMetric::Responses5xx => peer.responses.responses_5xx,
        UpstreamServerMetric::Sent => peer.sent,
        UpstreamServerMetric::Received => peer.received,
        UpstreamServerMetric::Fails => peer.fails,
        UpstreamServerMetric::Unavail => peer.unavail,
        UpstreamServerMetric::HeaderTime => peer.header_time,
        UpstreamServerMetric::ResponseTime => peer.response_time,
        UpstreamServerMetric::HealthChecksChecks => peer.health_checks.checks,
        UpstreamServerMetric::HealthChecksFails => peer.health_checks.fails,
        UpstreamServerMetric::HealthChecksUnhealthy => peer.health_checks.unhealthy,
    };
    value as f64
}

fn is_stream_health_check(metric: StreamUpstreamServerMetric) -> bool {
    matches!(
        metric,
        StreamUpstreamServerMetric::HealthChecksChecks
            | StreamUpstreamServerMetric::HealthChecksFails
            | StreamUpstreamServerMetric::HealthChecksUnhealthy
    )
}

fn stream_upstream_server_value(metric: StreamUpstreamServerMetric, peer: &StreamPeer) -> f64 {
    let value = match metric {
        StreamUpstreamServerMetric::State => return upstream_server_state_value(&peer.state),
        StreamUpstreamServerMetric::Active => peer.active,
        StreamUpstreamServerMetric::Limit => peer.max_conns,
        StreamUpstreamServerMetric::Connections => peer.connections,
        StreamUpstreamServerMetric::ConnectTime => peer.connect_time,
        StreamUpstreamServerMetric::FirstByteTime => peer.first_byte_time,
        StreamUpstreamServerMetric::ResponseTime => peer.response_time,
        StreamUpstreamServerMetric::Sent => peer.sent,
        StreamUpstreamServerMetric::Received => peer.received,
        StreamUpstreamServerMetric::Fails => peer.fails,
        StreamUpstreamServerMetric::Unavail => peer.unavail,
        StreamUpstreamServerMetric::HealthChecksChecks => peer.health_checks.checks,
        StreamUpstreamServerMetric::HealthChecksFails => peer.health_checks.fails,
        StreamUpstreamServerMetric::HealthChecksUnhealthy => peer.health_checks.unhealthy,
    };
    value as f64
}

fn zone_sync_value(metric: ZoneSyncMetric, sync: &StreamZoneSync) -> u64 {
    let status = &sync.status;
    match metric {
        ZoneSyncMetric::BytesIn => status.bytes_in,
        ZoneSyncMetric::BytesOut => status.bytes_out,
        ZoneSyncMetric::MsgsIn => status.msgs_in,
        ZoneSyncMetric::MsgsOut => status.msgs_out,
        ZoneSyncMetric::NodesOnline => status.nodes_online,
    }
}

fn location_zone_value(metric: LocationZoneMetric, zone: &LocationZone) -> u64 {
    match metric {
        LocationZoneMetric::Requests => zone.requests,
        LocationZoneMetric::Responses1xx => zone.responses.responses_1xx,
        LocationZoneMetric::Responses2xx => zone.responses.responses_2xx,
        LocationZoneMetric::Responses3xx => zone.responses.responses_3xx,
        LocationZoneMetric::Responses4xx => zone.responses.responses_4xx,
        LocationZoneMetric::Responses5xx => zone.responses.responses_5xx,
        LocationZoneMetric::Discarded => zone.discarded,
        LocationZoneMetric::Received => zone.received,
        LocationZoneMetric::Sent => zone.sent,
    }
}

fn resolver_value(metric: ResolverMetric, resolver: &Resolver) -> u64 {
    let (requests, responses) = (&resolver.requests, &resolver.responses);
    match metric {
        ResolverMetric::Name => requests.name,
        ResolverMetric::Srv => requests.srv,
        ResolverMetric::Addr => requests.addr,
        ResolverMetric::Noerror => responses.noerror,
        ResolverMetric::Formerr => responses.formerr,
        ResolverMetric::Servfail => responses.servfail,
        ResolverMetric::Nxdomain => responses.nxdomain,
        ResolverMetric::Notimp => responses.notimp,
        ResolverMetric::Refused => responses.refused,
        ResolverMetric::Timedout => responses.timedout,
        ResolverMetric::Unknown => responses.unknown,
    }
}

pub fn stub_samples(namespace: &str, stats: &StubStats) -> Vec<MetricSample> {
    StubMetric::ALL
        .iter()
        .map(|&m| MetricSample::of(namespace, m, stub_value(m, stats) as f64))
        .collect()
}

/// 将 Plus 统计快照展开为采样，各分组内按名称排序
pub fn plus_samples(namespace: &str, stats: &Stats) -> Vec<MetricSample> {
    let mut samples: Vec<MetricSample> = PlusMetric::ALL
        .iter()
        .map(|&m| MetricSample::of(namespace, m, plus_value(m, stats) as f64))
        .collect();

    for (name, zone) in sorted(&stats.server_zones) {
        for &metric in ServerZoneMetric::ALL {
            let value = server_zone_value(metric, zone) as f64;
            samples.push(
                MetricSample::of(namespace, metric, value).with_label("server_zone", name),
            );
        }
    }

    for (name, zone) in sorted(&stats.stream_server_zones) {
        for &metric in StreamServerZoneMetric::ALL {
            let value = stream_server_zone_value(metric, zone) as f64;
            samples.push(
                MetricSample::of(namespace, metric, value).with_label("server_zone", name),
            );
        }
    }

    for (name, upstream) in sorted(&stats.upstreams) {
        for peer in &upstream.peers {
            let has_health_checks = peer.health_checks != HealthChecks::default();
            for &metric in UpstreamServerMetric::ALL {
                if is_health_check(metric) && !has_health_checks {
                    continue;
                }
                let value = upstream_server_value(metric, peer);
                samples.push(
                    MetricSample::of(namespace, metric, value)
                        .with_label("upstream", name)
                        .with_label("server", peer.server.as_str()),
                );
            }
        }
        for &metric in UpstreamMetric::ALL {
            let value = upstream_value(metric, upstream) as f64;
            samples.push(MetricSample::of(namespace, metric, value).with_label("upstream", name));
        }
    }

    for (name, upstream) in sorted(&stats.stream_upstreams) {
        for peer in &upstream.peers {
            let has_health_checks = peer.health_checks != HealthChecks::default();
            for &metric in StreamUpstreamServerMetric::ALL {
                if is_stream_health_check(metric) && !has_health_checks {
                    continue;
                }
                let value = stream_upstream_server_value(metric, peer);
                samples.push(
                    MetricSample::of(namespace, metric, value)
                        .with_label("upstream", name)
                        .with_label("server", peer.server.as_str()),
                );
            }
        }
        let zombies = upstream.zombies as f64;
        samples.push(
            MetricSample::of(namespace, StreamUpstreamMetric::Zombies, zombies)
                .with_label("upstream", name),
        );
    }

    if let Some(sync) = &stats.stream_zone_sync {
        for (name, zone) in sorted(&sync.zones) {
            for &metric in ZoneSyncZoneMetric::ALL {
                let value = match metric {
                    ZoneSyncZoneMetric::RecordsPending => zone.records_pending,
                    ZoneSyncZoneMetric::RecordsTotal => zone.records_total,
                };
                samples.push(
                    MetricSample::of(namespace, metric, value as f64).with_label("zone", name),
                );
            }
        }
        for &metric in ZoneSyncMetric::ALL {
            let value = zone_sync_value(metric, sync) as f64;
            samples.push(MetricSample::of(namespace, metric, value));
        }
    }

    for (name, zone) in sorted(&stats.location_zones) {
        for &metric in LocationZoneMetric::ALL {
            let value = location_zone_value(metric, zone) as f64;
            samples.push(
                MetricSample::of(namespace, metric, value).with_label("location_zone", name),
            );
        }
    }

    for (name, resolver) in sorted(&stats.resolvers) {
        for &metric in ResolverMetric::ALL {
            let value = resolver_value(metric, resolver) as f64;
            samples.push(
                MetricSample::of(namespace, metric, value).with_label("resolver", name),
            );
        }
    }

    samples
}

/// 指标采集器，同一时刻只允许一次采集
#[derive(Debug)]
pub struct NginxCollector {
    client: NginxApiClient,
    namespace: String,
    lock: Mutex<()>,
}

impl NginxCollector {
    pub fn new(client: NginxApiClient, namespace: String) -> Self {
        Self {
            client,
            namespace,
            lock: Mutex::new(()),
        }
    }

    fn up(&self, value: f64) -> MetricSample {
        MetricSample::new(&self.namespace, "up", UP_HELP, MetricKind::Gauge, value)
    }

    /// 采集一次；获取失败时只返回 up=0
    pub async fn collect(&self) -> Vec<MetricSample> {
        let _guard = self.lock.lock().await;

        let result = match &self.client {
            NginxApiClient::Oss(client) => client
                .get_stub_stats()
                .await
                .map(|stats| stub_samples(&self.namespace, &stats)),
            NginxApiClient::Plus(client) => client
                .get_stats()
                .await
                .map(|stats| plus_samples(&self.namespace, &stats)),
        };

        match result {
            Ok(samples) => {
                debug!(count = samples.len(), "采集完成");
                let mut all = Vec::with_capacity(samples.len() + 1);
                all.push(self.up(1.0));
                all.extend(samples);
                all
            }
            Err(e) => {
                error!("获取 {} 统计信息失败: {}", self.client.kind(), e);
                vec![self.up(0.0)]
            }
        }
    }
}

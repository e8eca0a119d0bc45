// 服务层模块
pub mod client_factory;
pub mod collector;
pub mod keyval;
pub mod plus_client;
pub mod plus_stats;
pub mod reconciler;
pub mod rest_client;
pub mod stub_status;
pub mod transport;
pub mod unix_socket;

#[cfg(test)]
pub(crate) mod fake_nginx;

pub use client_factory::{NginxApiClient, connect_with_retries, create_client_with_retries};
pub use collector::NginxCollector;
pub use plus_client::NginxPlusClient;
pub use reconciler::{determine_updates, normalize_servers};
pub use rest_client::{API_VERSION, RestClient};
pub use stub_status::{NginxClient, parse_stub_stats};
pub use transport::{HttpTransport, ReqwestTransport, UnixSocketTransport, build_transport};
pub use unix_socket::UnixSocketAddress;

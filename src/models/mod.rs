pub mod metric;
pub mod stats;
pub mod stub_stats;
pub mod upstream;

pub use metric::*;
pub use stats::*;
pub use stub_stats::*;
pub use upstream::*;

pub mod aggregator;
pub mod static_urls;

pub use aggregator::AggregatorConfig;
pub use static_urls::{StaticUrlConfig, StaticUrlFile};

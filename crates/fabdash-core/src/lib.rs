pub mod alerts;
pub mod cache;
pub mod config;
pub mod error;
pub mod frames;
pub mod hourly;
pub mod loader;
pub mod metrics;
pub mod model;

pub use alerts::{alert_summary, quantile, AlertCount, AlertKind, AlertSummary};
pub use cache::TableCache;
pub use config::DashboardConfig;
pub use error::{PipelineError, Result};
pub use hourly::{hourly_aggregates, BucketMeans, HourlyAggregate, HourlyBucket};
pub use loader::{load, load_from_reader, load_with_options, LoadOptions};
pub use metrics::{
    data_overview, operations_overview, summary_metrics, DataOverview, OperatingGroup,
    OperationsOverview, SummaryMetrics,
};
pub use model::{SensorField, SensorReading, SensorTable};

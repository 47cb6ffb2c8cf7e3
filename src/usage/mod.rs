//! Claude Code usage monitoring - ingestion, windowing and publication

pub mod alerts;
pub mod background;
pub mod blocks;
pub mod config;
pub mod models;
pub mod pace;
pub mod periods;
pub mod pricing;
pub mod reader;
pub mod status;

pub use alerts::{AlertEvent, AlertSink, LogAlertSink, ThresholdAlerter};
pub use background::Monitor;
pub use blocks::{find_active_block, BLOCK_DURATION_MINUTES};
pub use config::{default_settings_path, get_claude_data_dir, RefreshInterval, Settings};
pub use models::{Block, BurnRate, PeriodTotals, Projection, Snapshot, UsageRecord};
pub use pace::{pace_band, usage_fraction, Pace};
pub use periods::{period_totals, weekly_reset_point};
pub use pricing::PricingCalculator;
pub use reader::scan_usage_records;
pub use status::{render_status, write_status, StatusFile};

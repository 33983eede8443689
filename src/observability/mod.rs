//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Controllers and breakers produce:
//!     → recorder.rs (MetricsSink: bounded event log + per-source totals)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tracing events (structured logs, logging.rs installs the subscriber)
//!
//! Consumers:
//!     → Log output (stdout, plain or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → End-of-run summary (recorder totals)
//! ```
//!
//! # Design Decisions
//! - Controllers only see the `MetricsSink` trait; the recorder is injected
//! - Rejections are a distinct failure kind all the way to the sink

pub mod logging;
pub mod metrics;
pub mod recorder;

pub use recorder::{EventKind, EventRecorder, MetricEvent, MetricsSink, SourceSummary};

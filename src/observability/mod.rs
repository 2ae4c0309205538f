//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and upstream clients produce:
//!     → tracing events (structured fields, request-id span from tower-http)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber's fmt layer
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Log filtering comes from `RUST_LOG`, falling back to the configured level
//! - Request ID flows through the trace span of every request

pub mod metrics;

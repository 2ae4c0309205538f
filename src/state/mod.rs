//! Cross-request state, injected through `AppState`.

pub mod readings;

pub use readings::{Reading, ScaleReadings};

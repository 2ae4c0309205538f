//! Terminal Field/Value XML gateway library.
//!
//! Kiosk terminals post Field/Value XML; the gateway extracts the fields,
//! optionally consults ViaCEP, Nominatim or Groq, and answers with a UTF-16
//! `ResponseV2` or `Response` document.

pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod state;
pub mod upstream;
pub mod xml;

pub use config::schema::GatewayConfig;
pub use error::AppError;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;

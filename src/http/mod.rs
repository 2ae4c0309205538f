//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, routes)
//!     → request.rs (request ID, payload location and decoding)
//!     → [handlers]
//!     → response.rs (UTF-16 body, content type)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{resolve_input, InputPolicy, MakeRequestUuid, X_REQUEST_ID};
pub use response::{xml_response, Charset};
pub use server::{AppState, HttpServer};

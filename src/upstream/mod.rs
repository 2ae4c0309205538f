//! Third-party service clients.
//!
//! # Data Flow
//! ```text
//! handler
//!     → viacep.rs / nominatim.rs / groq.rs (reqwest, per-client timeout)
//!     → types.rs (Address, UpstreamError)
//!     → handler maps the result onto output fields
//! ```
//!
//! # Design Decisions
//! - No retries: a failed call fails the request
//! - Every call records an upstream metric, success or not
//! - Base URLs come from config so tests can point clients at local mocks

pub mod groq;
pub mod nominatim;
pub mod types;
pub mod viacep;

pub use groq::GroqClient;
pub use nominatim::NominatimClient;
pub use types::{Address, UpstreamError, UpstreamResult};
pub use viacep::ViaCepClient;

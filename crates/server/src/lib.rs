//! HTTP REST API for lensprint engraving identification.
//!
//! Exposes the identification core over three endpoints: `POST /api/v1/match`
//! ranks a query embedding against the reference catalog,
//! `POST /api/v1/validate` records a human confirmation or correction, and
//! `GET /api/v1/report` returns rolling accuracy/latency metrics. The
//! reference index is loaded once at startup (from a snapshot or by embedding
//! the reference tree) and shared read-only across requests; the prediction
//! monitor serializes its own mutation internally.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;

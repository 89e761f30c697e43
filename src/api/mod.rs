//! HTTP surface: the ingestion gateway and context aggregator endpoints,
//! plus the ambient auth routes every client-facing service in this
//! corpus ships.

mod auth;
mod envelope;
mod handlers;
mod middleware;
mod routes;
mod state;

pub use routes::api_routes;
pub use state::ApiState;

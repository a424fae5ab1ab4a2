//! # Turnstile Server
//!
//! HTTP front for the session engine, meant to answer a reverse proxy's
//! auth subrequests. Pair it with nginx like so:
//!
//! ```text
//! location = /_turnstile {
//!     internal;
//!     proxy_pass http://127.0.0.1:8081;
//!     proxy_pass_request_body off;
//!     proxy_set_header Content-Length "";
//!     proxy_set_header X-Jwt-Claim-Sub $jwt_claim_sub;
//!     proxy_set_header X-Jwt-Claim-Aud $jwt_claim_aud;
//! }
//! ```
//!
//! The subrequest's `Set-Cookie` must be copied onto the client response
//! (`auth_request_set` + `add_header`) for a new session to reach the
//! browser.

pub mod config;
pub mod error;
pub mod handler;
pub mod server;
pub mod state;

pub use config::{ClaimHeaders, ConfigError, ListenConfig, ServerConfig, StoreBackend, StoreConfig};
pub use error::{Result, ServerError};
pub use handler::{Body, HEALTH_PATH, handle_request};
pub use server::{DRAIN_TIMEOUT, Server, shutdown_signal};
pub use state::AppState;

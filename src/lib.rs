// Turnstile - session gatekeeper for reverse-proxy auth subrequests
//
// Validates session cookies against an expiring store and mints new
// sessions from identity claims asserted by a trusted proxy.

// Re-export the session engine
pub use turnstile_session::*;

pub use turnstile_log;
pub use turnstile_redis;
pub use turnstile_session;

#[cfg(feature = "server")]
pub use turnstile_server;

/// Prelude for common imports
pub mod prelude {
    pub use turnstile_session::prelude::*;

    #[cfg(feature = "server")]
    pub use turnstile_server::{AppState, Server, ServerConfig};
}

//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Internal error detail (outside production only)
//! 7. Admin gate on `/api/admin/**`, rate limiting on login/register

pub mod auth;
pub mod error_detail;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthFailure, OptionalUser, clear_current_user, require_admin, set_current_user,
};
pub use error_detail::{InternalErrorDetail, internal_error_detail_middleware};
pub use rate_limit::{auth_rate_limiter, rate_limit_envelope};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;

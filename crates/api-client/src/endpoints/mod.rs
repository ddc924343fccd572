//! Endpoint-specific API implementations
//!
//! | Module | Backend route | Description |
//! |--------|---------------|-------------|
//! | `auth` | `login/`, `token/refresh/` | Sign in, sign out, session restore |

pub mod auth;

pub use auth::AuthApi;

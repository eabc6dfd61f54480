pub mod auth;
pub use auth::require_api_key;

pub mod api_errors;
pub mod auth;
pub mod http;
pub mod notifier;
pub mod stripe_client;

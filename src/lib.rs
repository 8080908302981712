pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {services::order_service::OrderService, std::sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService>,
}

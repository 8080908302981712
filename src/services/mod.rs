pub mod commit;
pub mod gateway_event;
pub mod listing_cache;
pub mod order_service;
pub mod worker;

pub mod log_routes;
pub mod usage_routes;

pub mod config;
pub mod scheduler;
pub mod shutdown;
pub mod system_info;

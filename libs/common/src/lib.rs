//! Unigate basic library
//!
//! Provides basic functions shared by all services, including:
//! - logging bootstrap
//! - graceful shutdown signal handling

pub mod logging;
pub mod shutdown;

pub use logging::init_logging;
pub use shutdown::wait_for_shutdown;

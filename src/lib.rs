pub mod config;
pub mod driver;
pub mod kernel;
pub mod services;

// Re-export specific items if needed for convenient access
pub use kernel::orchestrator::Orchestrator;

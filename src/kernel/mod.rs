pub mod avatar;
pub mod event;
pub mod idle;
pub mod log;
pub mod orchestrator;
pub mod quiet;
pub mod recognition;
pub mod scheduler;
pub mod state;
pub mod status;
pub mod telemetry;
pub mod time;
pub mod trigger;

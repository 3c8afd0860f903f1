pub mod agents;
pub mod config;
pub mod context;
pub mod errors;
pub mod prompt;
pub mod providers;
pub mod runner;
pub mod session;

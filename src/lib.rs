pub mod assembler;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod lock;
pub mod log;
pub mod plan;
pub mod queue;
pub mod state_file;
pub mod types;

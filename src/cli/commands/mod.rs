//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod index;
mod serve;
mod tools;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use index::{run_index, run_index_global};
pub use serve::run_serve;
pub use tools::{run_tool_index, run_tools};

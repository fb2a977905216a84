//! CLI command handlers. Each command is in its own file.

mod config_path;
mod grab;

pub use config_path::run_config_path;
pub use grab::run_grab;

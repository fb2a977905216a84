//! `wallcap config-path` – print where the config file lives.

use anyhow::Result;
use std::path::Path;
use wallcap_core::config;

pub fn run_config_path(explicit: Option<&Path>) -> Result<()> {
    match explicit {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", config::config_path()?.display()),
    }
    Ok(())
}

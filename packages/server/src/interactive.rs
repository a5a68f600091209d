//! Interactive mode for the server.
//!
//! Prompts for the server options, using the environment values as
//! defaults, and confirms before starting.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};
use highway_plan_dashboard::DashboardConfig;
use highway_plan_dashboard::config::AssetLocation;

use crate::ServerOptions;

/// Runs the server in interactive mode.
///
/// Each prompt defaults to the matching field of `defaults`. The data
/// directory defaults to the configured one and, when answered, replaces
/// any configured asset URL.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run(defaults: ServerOptions) -> std::io::Result<()> {
    println!("Highway Plan Dashboard Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(defaults.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| defaults.bind_addr.clone());

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(defaults.port)
        .interact_text()
        .unwrap_or(defaults.port);

    let data_dir: String = Input::new()
        .with_prompt("Data directory")
        .default(default_data_dir(&defaults))
        .interact_text()
        .unwrap_or_else(|_| default_data_dir(&defaults));

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(ServerOptions {
        bind_addr,
        port,
        data_dir: Some(PathBuf::from(data_dir)),
    })
    .await
}

fn default_data_dir(defaults: &ServerOptions) -> String {
    if let Some(dir) = &defaults.data_dir {
        return dir.display().to_string();
    }
    match DashboardConfig::load().map(|config| config.assets.location()) {
        Ok(AssetLocation::Directory(dir)) => dir.display().to_string(),
        Ok(AssetLocation::Url(_)) | Err(_) => "data".to_string(),
    }
}

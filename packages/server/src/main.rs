#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Highway plan dashboard server binary.
//!
//! Pass `--interactive` to be prompted for the bind address, port and
//! data directory.

use highway_plan_server::ServerOptions;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let options = ServerOptions::from_env();
    if std::env::args().skip(1).any(|arg| arg == "--interactive") {
        highway_plan_server::interactive::run(options).await
    } else {
        highway_plan_server::run_server(options).await
    }
}

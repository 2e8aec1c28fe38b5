// Arcana
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

pub mod bootstrap;
pub mod cards;
pub mod channels;
pub mod config;
pub mod context;
pub mod conversation;
pub mod db;
pub mod dispatch;
pub mod entitlement;
pub mod gateway;
pub mod import;
pub mod messages;
pub mod reminder;
pub mod server;
pub mod util;
pub mod webhook;

use clap::{Parser, Subcommand};

use arcana_common::error::ArcanaError;

/// The Arcana server
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the bot core and the payment API
    Serve(server::ServeArgs),
    /// Ensure the subscription plan catalog exists
    Bootstrap(bootstrap::BootstrapArgs),
    /// One-time import of a legacy storage snapshot
    Import(import::ImportArgs),
}

#[tokio::main]
async fn main() -> Result<(), ArcanaError> {
    let args = Cli::parse();
    match args.command {
        Commands::Serve(serve) => server::init_server(serve).await,
        Commands::Bootstrap(bootstrap) => bootstrap::init_bootstrap(bootstrap).await,
        Commands::Import(import) => import::init_import(import).await,
    }
}

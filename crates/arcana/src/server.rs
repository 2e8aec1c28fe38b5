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

use clap::Args;
use clap_verbosity_flag::Verbosity;
use sea_orm::Database;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_log::AsTrace;

use crate::channels::echo::EchoChannel;
use crate::config::Settings;
use crate::context::AppContext;
use crate::conversation::ContextStore;
use crate::db;
use crate::dispatch::Dispatcher;
use crate::gateway::PaymentGateway;
use crate::messages::MessageCatalog;
use crate::webhook;
use arcana_common::error::{ArcanaError, Result};

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

pub async fn init_server(args: ServeArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(args.verbose.log_level_filter().as_trace())
        .init();

    let settings = Settings::load(args.config.as_deref())?;
    let messages = MessageCatalog::load(settings.messages_file.as_deref())?;

    let uri = format!("sqlite://{}?mode=rwc", settings.database);
    let db = Database::connect(&uri).await?;
    db::migration::migrate(&db).await?;

    let bind = settings.bind.clone();
    let ctx = AppContext {
        db,
        channel: Arc::new(EchoChannel),
        gateway: PaymentGateway::new(&settings.gateway),
        settings,
        messages,
        contexts: ContextStore::new(),
    };

    // the chat transport binding feeds inbound updates through here; until
    // one is attached, outbound traffic lands in the log via EchoChannel
    let dispatcher = Arc::new(Dispatcher::new(ctx.clone()));

    let addr: SocketAddr = bind
        .parse()
        .map_err(|_| ArcanaError::Config(format!("unable to parse bind address `{}`", bind)))?;
    info!(%addr, "payment api listening");

    let app = webhook::router(ctx);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    dispatcher.shutdown().await;
    Ok(())
}

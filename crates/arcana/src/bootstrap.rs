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
use sea_orm::{Database, DatabaseConnection};
use std::path::PathBuf;
use tracing::info;
use tracing_log::AsTrace;

use crate::config::Settings;
use crate::db::{self, plan::NewPlan};
use arcana_common::error::Result;

#[derive(Debug, Args)]
pub struct BootstrapArgs {
    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// The published catalog. Plans are immutable once created, so reruns only
/// ever fill gaps.
const CATALOG: [NewPlan<'static>; 3] = [
    NewPlan {
        code: "free",
        name: "Free",
        price: 0,
        duration_days: 999999,
        daily_sessions_limit: 1,
        cards_limit: Some(10),
        gateway_subscription_id: None,
        description: Some("One session a day, the first ten cards of each deck"),
    },
    NewPlan {
        code: "monthly",
        name: "Monthly premium",
        price: 300,
        duration_days: 30,
        daily_sessions_limit: 3,
        cards_limit: None,
        gateway_subscription_id: None,
        description: Some("Three sessions a day and the full deck, for a month"),
    },
    NewPlan {
        code: "yearly",
        name: "Yearly premium",
        price: 3000,
        duration_days: 365,
        daily_sessions_limit: 3,
        cards_limit: None,
        gateway_subscription_id: None,
        description: Some("Three sessions a day and the full deck, for a year"),
    },
];

/// Create-if-absent by code; returns (created, skipped).
pub async fn ensure_plans(db: &DatabaseConnection) -> Result<(usize, usize)> {
    let mut created = 0;
    let mut skipped = 0;

    for entry in CATALOG {
        if db::plan::exists_by_code(entry.code, db).await? {
            info!(code = entry.code, "plan already exists, skipping");
            skipped += 1;
        } else {
            let plan = db::plan::create(entry, db).await?;
            info!(code = plan.code, name = plan.name, "created plan");
            created += 1;
        }
    }

    Ok((created, skipped))
}

pub async fn init_bootstrap(args: BootstrapArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(args.verbose.log_level_filter().as_trace())
        .init();

    let settings = Settings::load(args.config.as_deref())?;
    let uri = format!("sqlite://{}?mode=rwc", settings.database);
    let db = Database::connect(&uri).await?;
    db::migration::migrate(&db).await?;

    let (created, skipped) = ensure_plans(&db).await?;
    println!("Done. Created: {}, skipped: {}", created, skipped);

    println!("Current catalog:");
    for plan in db::plan::list(&db).await? {
        let cards = plan
            .cards_limit
            .map(|limit| limit.to_string())
            .unwrap_or_else(|| "all".to_owned());
        let status = if plan.is_active { "active" } else { "inactive" };
        println!(
            "  - {} ({}): {}, {} sessions/day, {} cards - {}",
            plan.name, plan.code, plan.price, plan.daily_sessions_limit, cards, status
        );
    }
    Ok(())
}

#[cfg(test)]
mod test_bootstrap {
    use super::*;
    use crate::util::get_test_db;

    #[tokio::test]
    async fn it_should_be_idempotent() {
        let db = get_test_db().await;

        let (created, skipped) = ensure_plans(&db).await.unwrap();
        assert_eq!((created, skipped), (3, 0));

        let (created, skipped) = ensure_plans(&db).await.unwrap();
        assert_eq!((created, skipped), (0, 3));

        let plans = db::plan::list(&db).await.unwrap();
        assert_eq!(plans.len(), 3);
        assert!(plans.iter().all(|p| p.is_active));

        let free = db::plan::get_active_by_code("free", &db).await.unwrap().unwrap();
        assert_eq!(free.daily_sessions_limit, 1);
        assert_eq!(free.cards_limit, Some(10));
    }
}

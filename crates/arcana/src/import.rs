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

use chrono::NaiveDateTime;
use clap::Args;
use clap_verbosity_flag::Verbosity;
use sea_orm::{ActiveModelTrait, ActiveValue, Database, DatabaseConnection};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_log::AsTrace;

use crate::config::Settings;
use crate::db::{self, entities::profile, entities::state_log};
use arcana_common::error::Result;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the legacy snapshot (JSON export of the old storage)
    #[arg(short, long)]
    source: PathBuf,

    /// Parse and report without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    profiles: Vec<LegacyProfile>,
    #[serde(default)]
    states: Vec<LegacyState>,
}

#[derive(Debug, Deserialize)]
struct LegacyProfile {
    chat_id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    is_staff: bool,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyState {
    chat_id: i64,
    state_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub profiles: usize,
    pub states: usize,
    pub skipped: usize,
}

/// Old exports carry either the sqlite format or RFC 3339; anything else
/// falls back to now.
fn parse_timestamp(raw: Option<&str>) -> String {
    if let Some(raw) = raw {
        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
                return parsed.format("%Y-%m-%d %H:%M:%S").to_string();
            }
        }
        warn!(raw, "unparseable timestamp, falling back to now");
    }
    db::now_local()
}

/// Upserts profiles and replays state history from a prior storage
/// snapshot. One-time operation; reruns upsert rather than duplicate
/// profiles, but state rows are appended as-is.
pub async fn import_snapshot(
    path: &Path,
    dry_run: bool,
    db: &DatabaseConnection,
) -> Result<ImportReport> {
    let raw = std::fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&raw)?;
    info!(
        profiles = snapshot.profiles.len(),
        states = snapshot.states.len(),
        dry_run,
        "loaded snapshot"
    );

    let mut report = ImportReport::default();
    if dry_run {
        report.profiles = snapshot.profiles.len();
        report.states = snapshot.states.len();
        return Ok(report);
    }

    for legacy in &snapshot.profiles {
        let imported = db::profile::upsert(
            legacy.chat_id,
            legacy.username.as_deref(),
            &legacy.first_name,
            db,
        )
        .await?;

        let mut patch: profile::ActiveModel = imported.into();
        patch.is_staff = ActiveValue::Set(legacy.is_staff);
        patch.created_at = ActiveValue::Set(parse_timestamp(legacy.created_at.as_deref()));
        patch.update(db).await?;
        report.profiles += 1;
    }

    for legacy in &snapshot.states {
        let Some(profile) = db::profile::get_by_chat_id(legacy.chat_id, db).await? else {
            warn!(chat_id = legacy.chat_id, "state row for unknown profile skipped");
            report.skipped += 1;
            continue;
        };
        let entry = state_log::ActiveModel {
            id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
            profile_id: ActiveValue::Set(profile.id),
            state_name: ActiveValue::Set(legacy.state_name.clone()),
            description: ActiveValue::Set(legacy.description.clone()),
            created_at: ActiveValue::Set(parse_timestamp(legacy.created_at.as_deref())),
        };
        entry.insert(db).await?;
        report.states += 1;
    }

    Ok(report)
}

pub async fn init_import(args: ImportArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(args.verbose.log_level_filter().as_trace())
        .init();

    let settings = Settings::load(args.config.as_deref())?;
    let uri = format!("sqlite://{}?mode=rwc", settings.database);
    let db = Database::connect(&uri).await?;
    db::migration::migrate(&db).await?;

    let report = import_snapshot(&args.source, args.dry_run, &db).await?;
    println!(
        "Imported profiles: {}\nImported state rows: {}\nSkipped rows: {}",
        report.profiles, report.states, report.skipped
    );
    Ok(())
}

#[cfg(test)]
mod test_import {
    use super::*;
    use crate::util::get_test_db;

    fn write_snapshot(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn it_should_upsert_profiles_and_replay_states() {
        let db = get_test_db().await;
        // one profile already known under another name
        db::profile::upsert(2, None, "Old Name", &db).await.unwrap();

        let (_dir, path) = write_snapshot(
            r#"{
                "profiles": [
                    {"chat_id": 1, "username": "one", "first_name": "One",
                     "is_staff": true, "created_at": "2023-05-01 10:00:00"},
                    {"chat_id": 2, "first_name": "Two", "created_at": "not a date"}
                ],
                "states": [
                    {"chat_id": 1, "state_name": "awaiting_topic",
                     "created_at": "2023-05-01T10:00:05"},
                    {"chat_id": 1, "state_name": "terminal"},
                    {"chat_id": 99, "state_name": "awaiting_topic"}
                ]
            }"#,
        );

        let report = import_snapshot(&path, false, &db).await.unwrap();
        assert_eq!(report.profiles, 2);
        assert_eq!(report.states, 2);
        assert_eq!(report.skipped, 1);

        let one = db::profile::get_by_chat_id(1, &db).await.unwrap().unwrap();
        assert!(one.is_staff);
        assert_eq!(one.created_at, "2023-05-01 10:00:00");

        // malformed timestamp fell back to now
        let two = db::profile::get_by_chat_id(2, &db).await.unwrap().unwrap();
        assert_eq!(two.first_name, "Two");
        assert!(two.created_at.starts_with(&db::today_local_midnight()[..10]));

        let log = db::state_log::get_by_profile(&one.id, None, None, &db)
            .await
            .unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].state_name, "awaiting_topic");
        assert_eq!(log[0].created_at, "2023-05-01 10:00:05");
    }

    #[tokio::test]
    async fn it_should_write_nothing_on_a_dry_run() {
        let db = get_test_db().await;
        let (_dir, path) = write_snapshot(
            r#"{"profiles": [{"chat_id": 5, "first_name": "Five"}], "states": []}"#,
        );

        let report = import_snapshot(&path, true, &db).await.unwrap();
        assert_eq!(report.profiles, 1);
        assert!(db::profile::get_by_chat_id(5, &db).await.unwrap().is_none());
    }
}

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

use sea_orm::*;
use tracing::warn;

use super::entities::{prelude::*, *};
use super::now_local;
use arcana_common::error::Result;

/// Opens one conversation attempt. `completed_at` stays null until the flow
/// reaches its terminal acknowledgment.
pub async fn create(
    profile_id: &str,
    request_text: &str,
    request_category: &str,
    card_category: &str,
    card_index: i32,
    db: &DatabaseConnection,
) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    let entry = session::ActiveModel {
        id: ActiveValue::Set(id.clone()),
        profile_id: ActiveValue::Set(profile_id.to_owned()),
        request_text: ActiveValue::Set(request_text.to_owned()),
        request_category: ActiveValue::Set(request_category.to_owned()),
        card_category: ActiveValue::Set(card_category.to_owned()),
        card_index: ActiveValue::Set(card_index),
        // written explicitly: the quota window is measured against local
        // midnight, and the column default would record UTC
        started_at: ActiveValue::Set(now_local()),
        ..Default::default()
    };
    entry.insert(db).await?;
    Ok(id)
}

/// Stamps the most recently started open attempt for the profile. A missing
/// open attempt is not an error: the flow may have been restarted mid-way.
pub async fn complete_latest_open(profile_id: &str, db: &DatabaseConnection) -> Result<()> {
    let entry = Session::find()
        .filter(session::Column::ProfileId.eq(profile_id))
        .filter(session::Column::CompletedAt.is_null())
        .order_by(session::Column::StartedAt, Order::Desc)
        .one(db)
        .await?;

    match entry {
        Some(e) => {
            let mut e: session::ActiveModel = e.into();
            e.completed_at = ActiveValue::Set(Some(now_local()));
            e.update(db).await?;
            Ok(())
        }
        None => {
            warn!(profile_id, "no open attempt to complete");
            Ok(())
        }
    }
}

pub async fn count_started_since(
    profile_id: &str,
    since: &str,
    db: &DatabaseConnection,
) -> Result<u64> {
    let count = Session::find()
        .filter(session::Column::ProfileId.eq(profile_id))
        .filter(session::Column::StartedAt.gte(since))
        .count(db)
        .await?;
    Ok(count)
}

pub async fn get_by_profile(
    profile_id: &str,
    db: &DatabaseConnection,
) -> Result<Vec<session::Model>> {
    let entries = Session::find()
        .filter(session::Column::ProfileId.eq(profile_id))
        .order_by(session::Column::StartedAt, Order::Asc)
        .all(db)
        .await?;
    Ok(entries)
}

pub async fn count_completed(db: &DatabaseConnection) -> Result<u64> {
    let count = Session::find()
        .filter(session::Column::CompletedAt.is_not_null())
        .count(db)
        .await?;
    Ok(count)
}

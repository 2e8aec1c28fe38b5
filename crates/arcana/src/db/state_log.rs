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

use super::entities::{prelude::*, *};
use arcana_common::error::Result;

/// Append-only; rows are never updated or deleted.
pub async fn create(
    profile_id: &str,
    state_name: &str,
    description: Option<&str>,
    db: &DatabaseConnection,
) -> Result<()> {
    let entry = state_log::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        profile_id: ActiveValue::Set(profile_id.to_owned()),
        state_name: ActiveValue::Set(state_name.to_owned()),
        description: ActiveValue::Set(description.map(str::to_owned)),
        ..Default::default()
    };
    entry.insert(db).await?;
    Ok(())
}

pub async fn get_by_profile(
    profile_id: &str,
    limit: Option<u64>,
    offset: Option<u64>,
    db: &DatabaseConnection,
) -> Result<Vec<state_log::Model>> {
    let entries = StateLog::find()
        .filter(state_log::Column::ProfileId.eq(profile_id))
        .order_by(state_log::Column::CreatedAt, Order::Asc)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;
    Ok(entries)
}

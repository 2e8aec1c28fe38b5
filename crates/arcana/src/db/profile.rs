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
use super::now_local;
use arcana_common::error::Result;

/// Creates the profile on first contact, or refreshes the mutable identity
/// fields (and `last_seen_at`) on every subsequent one.
pub async fn upsert(
    chat_id: i64,
    username: Option<&str>,
    first_name: &str,
    db: &DatabaseConnection,
) -> Result<profile::Model> {
    let Some(existing) = Profile::find()
        .filter(profile::Column::ChatId.eq(chat_id))
        .one(db)
        .await?
    else {
        let entry = profile::ActiveModel {
            id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
            chat_id: ActiveValue::Set(chat_id),
            username: ActiveValue::Set(username.map(str::to_owned)),
            first_name: ActiveValue::Set(first_name.to_owned()),
            last_seen_at: ActiveValue::Set(Some(now_local())),
            ..Default::default()
        };
        return Ok(entry.insert(db).await?);
    };

    let mut existing: profile::ActiveModel = existing.into();
    existing.username = ActiveValue::Set(username.map(str::to_owned));
    existing.first_name = ActiveValue::Set(first_name.to_owned());
    existing.last_seen_at = ActiveValue::Set(Some(now_local()));
    Ok(existing.update(db).await?)
}

pub async fn get_by_chat_id(
    chat_id: i64,
    db: &DatabaseConnection,
) -> Result<Option<profile::Model>> {
    let entry = Profile::find()
        .filter(profile::Column::ChatId.eq(chat_id))
        .one(db)
        .await?;
    Ok(entry)
}

pub async fn get_by_id(id: &str, db: &DatabaseConnection) -> Result<Option<profile::Model>> {
    let entry = Profile::find_by_id(id).one(db).await?;
    Ok(entry)
}

/// The single write path for entitlement: plan reference plus expiry move
/// together or not at all.
pub async fn set_plan(
    id: &str,
    plan_id: &str,
    expires_at: Option<String>,
    db: &DatabaseConnection,
) -> Result<profile::Model> {
    let Some(entry) = Profile::find_by_id(id).one(db).await? else {
        return Err(DbErr::RecordNotFound(format!("profile ({}) not found", id)).into());
    };
    let mut entry: profile::ActiveModel = entry.into();
    entry.plan_id = ActiveValue::Set(Some(plan_id.to_owned()));
    entry.subscription_expires_at = ActiveValue::Set(expires_at);
    Ok(entry.update(db).await?)
}

pub async fn list_chat_ids(db: &DatabaseConnection) -> Result<Vec<i64>> {
    let entries = Profile::find().all(db).await?;
    Ok(entries.into_iter().map(|e| e.chat_id).collect())
}

pub async fn count(db: &DatabaseConnection) -> Result<u64> {
    Ok(Profile::find().count(db).await?)
}

pub async fn count_created_since(since: &str, db: &DatabaseConnection) -> Result<u64> {
    let count = Profile::find()
        .filter(profile::Column::CreatedAt.gte(since))
        .count(db)
        .await?;
    Ok(count)
}

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

pub struct NewPlan<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub price: i64,
    pub duration_days: i32,
    pub daily_sessions_limit: i32,
    pub cards_limit: Option<i32>,
    pub gateway_subscription_id: Option<&'a str>,
    pub description: Option<&'a str>,
}

pub async fn create(plan: NewPlan<'_>, db: &DatabaseConnection) -> Result<plan::Model> {
    let entry = plan::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        code: ActiveValue::Set(plan.code.to_owned()),
        name: ActiveValue::Set(plan.name.to_owned()),
        price: ActiveValue::Set(plan.price),
        duration_days: ActiveValue::Set(plan.duration_days),
        daily_sessions_limit: ActiveValue::Set(plan.daily_sessions_limit),
        cards_limit: ActiveValue::Set(plan.cards_limit),
        gateway_subscription_id: ActiveValue::Set(
            plan.gateway_subscription_id.map(str::to_owned),
        ),
        description: ActiveValue::Set(plan.description.map(str::to_owned)),
        ..Default::default()
    };
    Ok(entry.insert(db).await?)
}

pub async fn get_by_id(id: &str, db: &DatabaseConnection) -> Result<Option<plan::Model>> {
    let entry = Plan::find_by_id(id).one(db).await?;
    Ok(entry)
}

/// Plan lookup used by every user-facing flow: inactive catalog entries are
/// invisible outside the admin surface.
pub async fn get_active_by_code(
    code: &str,
    db: &DatabaseConnection,
) -> Result<Option<plan::Model>> {
    let entry = Plan::find()
        .filter(plan::Column::Code.eq(code))
        .filter(plan::Column::IsActive.eq(true))
        .one(db)
        .await?;
    Ok(entry)
}

pub async fn exists_by_code(code: &str, db: &DatabaseConnection) -> Result<bool> {
    let count = Plan::find()
        .filter(plan::Column::Code.eq(code))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn list(db: &DatabaseConnection) -> Result<Vec<plan::Model>> {
    let entries = Plan::find()
        .order_by(plan::Column::Price, Order::Asc)
        .all(db)
        .await?;
    Ok(entries)
}

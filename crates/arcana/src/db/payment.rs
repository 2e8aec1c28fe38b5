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

pub async fn create(
    order_id: &str,
    profile_id: &str,
    plan_id: Option<&str>,
    amount: i64,
    db: &DatabaseConnection,
) -> Result<payment::Model> {
    let entry = payment::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        order_id: ActiveValue::Set(order_id.to_owned()),
        profile_id: ActiveValue::Set(profile_id.to_owned()),
        plan_id: ActiveValue::Set(plan_id.map(str::to_owned)),
        amount: ActiveValue::Set(amount),
        ..Default::default()
    };
    Ok(entry.insert(db).await?)
}

pub async fn get_by_order_id(
    order_id: &str,
    db: &DatabaseConnection,
) -> Result<Option<payment::Model>> {
    let entry = Payment::find()
        .filter(payment::Column::OrderId.eq(order_id))
        .one(db)
        .await?;
    Ok(entry)
}

/// One field set per webhook delivery. The gateway identifiers only ever
/// fill in, never blank out; the raw payload is always replaced so the audit
/// trail reflects the last delivery.
pub struct NotificationUpdate {
    pub status: String,
    pub payment_id: Option<String>,
    pub subscription_id: Option<String>,
    pub webhook_payload: String,
    pub paid_at: Option<String>,
}

pub async fn record_notification(
    id: &str,
    update: NotificationUpdate,
    db: &DatabaseConnection,
) -> Result<payment::Model> {
    let Some(entry) = Payment::find_by_id(id).one(db).await? else {
        return Err(DbErr::RecordNotFound(format!("payment ({}) not found", id)).into());
    };

    let previous = entry.clone();
    let mut entry: payment::ActiveModel = entry.into();
    entry.status = ActiveValue::Set(update.status);
    entry.payment_id = ActiveValue::Set(update.payment_id.or(previous.payment_id));
    entry.subscription_id = ActiveValue::Set(update.subscription_id.or(previous.subscription_id));
    entry.webhook_payload = ActiveValue::Set(Some(update.webhook_payload));
    if let Some(paid_at) = update.paid_at {
        entry.paid_at = ActiveValue::Set(Some(paid_at));
    }
    Ok(entry.update(db).await?)
}

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

use chrono::{Duration, Local};
use sea_orm::DatabaseConnection;
use tracing::{error, info};

use crate::db::{self, entities::plan, entities::profile};
use arcana_common::error::Result;

/// Code of the zero-cost catalog entry. Profiles without a plan are put on
/// it before any quota decision is made.
pub const FREE_PLAN_CODE: &str = "free";

/// Quota applied when a profile somehow reaches the gate with no plan.
const FALLBACK_DAILY_QUOTA: u64 = 1;

pub async fn current_plan(
    profile: &profile::Model,
    db: &DatabaseConnection,
) -> Result<Option<plan::Model>> {
    match &profile.plan_id {
        Some(plan_id) => db::plan::get_by_id(plan_id, db).await,
        None => Ok(None),
    }
}

/// Attempts started since the profile's local midnight.
pub async fn daily_session_count(
    profile: &profile::Model,
    db: &DatabaseConnection,
) -> Result<u64> {
    db::session::count_started_since(&profile.id, &db::today_local_midnight(), db).await
}

pub async fn daily_quota(profile: &profile::Model, db: &DatabaseConnection) -> Result<u64> {
    match current_plan(profile, db).await? {
        Some(plan) => Ok(plan.daily_sessions_limit.max(0) as u64),
        None => Ok(FALLBACK_DAILY_QUOTA),
    }
}

pub async fn can_start_session(
    profile: &profile::Model,
    db: &DatabaseConnection,
) -> Result<bool> {
    let used = daily_session_count(profile, db).await?;
    let quota = daily_quota(profile, db).await?;
    Ok(used < quota)
}

/// None means the whole deck is available.
pub async fn available_card_limit(
    profile: &profile::Model,
    db: &DatabaseConnection,
) -> Result<Option<i32>> {
    Ok(current_plan(profile, db).await?.and_then(|p| p.cards_limit))
}

/// Plan held and not expired. The free tier never expires; paid tiers
/// expire strictly at their timestamp.
pub async fn is_entitled(profile: &profile::Model, db: &DatabaseConnection) -> Result<bool> {
    let Some(plan) = current_plan(profile, db).await? else {
        return Ok(false);
    };
    if plan.code == FREE_PLAN_CODE {
        return Ok(true);
    }
    match &profile.subscription_expires_at {
        None => Ok(true),
        Some(expires_at) => Ok(expires_at.as_str() > db::now_local().as_str()),
    }
}

/// The single authoritative entitlement mutation. Free-tier auto-assignment
/// and paid activation from webhook reconciliation both land here.
pub async fn activate(
    profile: &profile::Model,
    plan: &plan::Model,
    db: &DatabaseConnection,
) -> Result<profile::Model> {
    let expires_at = if plan.code == FREE_PLAN_CODE {
        None
    } else {
        let expiry = Local::now().naive_local() + Duration::days(plan.duration_days as i64);
        Some(expiry.format("%Y-%m-%d %H:%M:%S").to_string())
    };

    info!(
        chat_id = profile.chat_id,
        plan = plan.code,
        expires_at = expires_at.as_deref().unwrap_or("never"),
        "activating plan"
    );
    db::profile::set_plan(&profile.id, &plan.id, expires_at, db).await
}

/// Puts a plan-less profile on the free tier. Returns the profile unchanged
/// (loudly) when the catalog has not been bootstrapped.
pub async fn ensure_default_plan(
    profile: profile::Model,
    db: &DatabaseConnection,
) -> Result<profile::Model> {
    if profile.plan_id.is_some() {
        return Ok(profile);
    }
    match db::plan::get_active_by_code(FREE_PLAN_CODE, db).await? {
        Some(free) => activate(&profile, &free, db).await,
        None => {
            error!("free plan missing from catalog; run bootstrap");
            Ok(profile)
        }
    }
}

#[cfg(test)]
mod test_entitlement {
    use super::*;
    use crate::db::entities::session;
    use crate::util::{create_test_plans, get_test_db};
    use sea_orm::{ActiveModelTrait, ActiveValue};

    #[tokio::test]
    async fn it_should_auto_assign_the_free_plan() {
        let db = get_test_db().await;
        create_test_plans(&db).await;

        let profile = db::profile::upsert(111, Some("reader"), "Reader", &db)
            .await
            .unwrap();
        assert!(profile.plan_id.is_none());

        let profile = ensure_default_plan(profile, &db).await.unwrap();
        let plan = current_plan(&profile, &db).await.unwrap().unwrap();
        assert_eq!(plan.code, FREE_PLAN_CODE);
        assert_eq!(profile.subscription_expires_at, None);
        assert!(is_entitled(&profile, &db).await.unwrap());
    }

    #[tokio::test]
    async fn it_should_exhaust_the_daily_quota() {
        let db = get_test_db().await;
        create_test_plans(&db).await;

        let profile = db::profile::upsert(222, None, "Reader", &db).await.unwrap();
        let profile = ensure_default_plan(profile, &db).await.unwrap();

        assert_eq!(daily_quota(&profile, &db).await.unwrap(), 1);
        assert!(can_start_session(&profile, &db).await.unwrap());

        db::session::create(&profile.id, "request", "therapeutic", "day", 3, &db)
            .await
            .unwrap();
        assert_eq!(daily_session_count(&profile, &db).await.unwrap(), 1);
        assert!(!can_start_session(&profile, &db).await.unwrap());
    }

    #[tokio::test]
    async fn it_should_not_count_yesterdays_attempts() {
        let db = get_test_db().await;
        create_test_plans(&db).await;

        let profile = db::profile::upsert(333, None, "Reader", &db).await.unwrap();
        let profile = ensure_default_plan(profile, &db).await.unwrap();

        // a completed attempt started before today's local midnight
        let yesterday = (Local::now().naive_local() - Duration::days(1))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let stale = session::ActiveModel {
            id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
            profile_id: ActiveValue::Set(profile.id.clone()),
            request_text: ActiveValue::Set("old".to_owned()),
            request_category: ActiveValue::Set("coaching".to_owned()),
            card_category: ActiveValue::Set("night".to_owned()),
            card_index: ActiveValue::Set(1),
            started_at: ActiveValue::Set(yesterday.clone()),
            completed_at: ActiveValue::Set(Some(yesterday)),
        };
        stale.insert(&db).await.unwrap();

        assert_eq!(daily_session_count(&profile, &db).await.unwrap(), 0);
        assert!(can_start_session(&profile, &db).await.unwrap());
    }

    #[tokio::test]
    async fn it_should_raise_the_quota_after_upgrade() {
        let db = get_test_db().await;
        create_test_plans(&db).await;

        let profile = db::profile::upsert(444, None, "Reader", &db).await.unwrap();
        let profile = ensure_default_plan(profile, &db).await.unwrap();

        let monthly = db::plan::get_active_by_code("monthly", &db)
            .await
            .unwrap()
            .unwrap();
        let profile = activate(&profile, &monthly, &db).await.unwrap();

        assert_eq!(daily_quota(&profile, &db).await.unwrap(), 3);
        let expires_at = profile.subscription_expires_at.clone().unwrap();
        let expected = (Local::now().naive_local() + Duration::days(30))
            .format("%Y-%m-%d")
            .to_string();
        assert!(expires_at.starts_with(&expected));
        assert!(is_entitled(&profile, &db).await.unwrap());
    }

    #[tokio::test]
    async fn it_should_expire_paid_entitlement() {
        let db = get_test_db().await;
        create_test_plans(&db).await;

        let profile = db::profile::upsert(555, None, "Reader", &db).await.unwrap();
        let monthly = db::plan::get_active_by_code("monthly", &db)
            .await
            .unwrap()
            .unwrap();
        let expired = (Local::now().naive_local() - Duration::days(1))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let profile = db::profile::set_plan(&profile.id, &monthly.id, Some(expired), &db)
            .await
            .unwrap();

        assert!(!is_entitled(&profile, &db).await.unwrap());
    }

    #[tokio::test]
    async fn it_should_bound_the_card_pool_by_plan() {
        let db = get_test_db().await;
        create_test_plans(&db).await;

        let profile = db::profile::upsert(666, None, "Reader", &db).await.unwrap();
        let profile = ensure_default_plan(profile, &db).await.unwrap();
        assert_eq!(available_card_limit(&profile, &db).await.unwrap(), Some(10));

        let monthly = db::plan::get_active_by_code("monthly", &db)
            .await
            .unwrap()
            .unwrap();
        let profile = activate(&profile, &monthly, &db).await.unwrap();
        assert_eq!(available_card_limit(&profile, &db).await.unwrap(), None);
    }
}

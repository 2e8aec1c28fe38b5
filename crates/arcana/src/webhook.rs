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

use axum::{
    Router,
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use crate::context::AppContext;
use crate::db::{self, payment::NotificationUpdate};
use crate::entitlement;
use arcana_common::error::ArcanaError;
use arcana_common::payment::{PaymentStatus, WebhookNotification};

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/payments/webhook", post(payment_webhook))
        .route("/payments/success", get(payment_success))
        .with_state(ctx)
}

/// Why a delivery was turned away. Each kind maps to its own status so
/// callers can tell "malformed" from "untrusted" from "unknown".
enum WebhookError {
    MissingFields,
    UnknownStatus,
    BadSignature,
    NotFound,
    InvalidCustomer,
    Internal(ArcanaError),
}

impl From<ArcanaError> for WebhookError {
    fn from(err: ArcanaError) -> Self {
        WebhookError::Internal(err)
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, reason) = match self {
            WebhookError::MissingFields => (StatusCode::BAD_REQUEST, "Missing required fields"),
            WebhookError::UnknownStatus => (StatusCode::BAD_REQUEST, "Unknown payment status"),
            WebhookError::BadSignature => (StatusCode::FORBIDDEN, "Invalid signature"),
            WebhookError::NotFound => (StatusCode::NOT_FOUND, "Payment not found"),
            WebhookError::InvalidCustomer => (StatusCode::BAD_REQUEST, "Invalid customer data"),
            WebhookError::Internal(err) => {
                error!("webhook processing failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        (status, axum::Json(json!({ "error": reason }))).into_response()
    }
}

async fn payment_webhook(
    State(ctx): State<AppContext>,
    Form(form): Form<BTreeMap<String, String>>,
) -> Response {
    match reconcile(&ctx, &form).await {
        Ok((order_id, payment_status)) => axum::Json(json!({
            "status": "ok",
            "order_id": order_id,
            "payment_status": payment_status,
        }))
        .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Applies one gateway notification to the matching order and, on a fresh
/// `success`, to entitlement. Safe under duplicate delivery: a repeated
/// `success` only refreshes the audit payload.
async fn reconcile(
    ctx: &AppContext,
    form: &BTreeMap<String, String>,
) -> Result<(String, String), WebhookError> {
    let Some(note) = WebhookNotification::from_form(form) else {
        error!("webhook with missing required fields");
        return Err(WebhookError::MissingFields);
    };
    let Some(status) = PaymentStatus::parse(&note.payment_status) else {
        error!(status = note.payment_status, "webhook with unknown status");
        return Err(WebhookError::UnknownStatus);
    };

    // nothing is mutated before the signature checks out
    if !ctx.gateway.verify(form, &note.signature) {
        warn!(order_id = note.order_id, "webhook signature invalid");
        return Err(WebhookError::BadSignature);
    }
    info!(order_id = note.order_id, "webhook signature valid");

    let payment = match db::payment::get_by_order_id(&note.order_id, &ctx.db).await? {
        Some(payment) => payment,
        None => {
            // best-effort recovery through the correlation field
            let Some(customer_extra) = &note.customer_extra else {
                error!(
                    order_id = note.order_id,
                    "order not found and no customer_extra provided"
                );
                return Err(WebhookError::NotFound);
            };
            let Ok(chat_id) = customer_extra.parse::<i64>() else {
                error!(order_id = note.order_id, "customer_extra is not a chat id");
                return Err(WebhookError::InvalidCustomer);
            };
            let Some(profile) = db::profile::get_by_chat_id(chat_id, &ctx.db).await? else {
                error!(order_id = note.order_id, chat_id, "no profile for customer_extra");
                return Err(WebhookError::InvalidCustomer);
            };
            warn!(
                order_id = note.order_id,
                chat_id, "materializing order from webhook data"
            );
            db::payment::create(&note.order_id, &profile.id, None, 0, &ctx.db).await?
        }
    };

    let old_status = payment.status.clone();
    let newly_paid =
        status == PaymentStatus::Success && old_status != PaymentStatus::Success.as_str();

    let payload = serde_json::to_string(form).map_err(ArcanaError::from)?;
    let updated = db::payment::record_notification(
        &payment.id,
        NotificationUpdate {
            status: status.as_str().to_owned(),
            payment_id: note.payment_id.clone(),
            subscription_id: note.subscription_id.clone(),
            webhook_payload: payload,
            paid_at: newly_paid.then(db::now_local),
        },
        &ctx.db,
    )
    .await?;

    if newly_paid {
        activate_from_order(ctx, &updated).await?;
    }

    info!(
        order_id = note.order_id,
        from = old_status,
        to = status.as_str(),
        "processed webhook"
    );
    Ok((note.order_id, status.as_str().to_owned()))
}

/// Entitlement side of a fresh `success`. Integrity anomalies (order without
/// a plan, vanished plan or profile) are logged loudly and leave entitlement
/// untouched; they are not delivery failures.
async fn activate_from_order(
    ctx: &AppContext,
    payment: &db::entities::payment::Model,
) -> Result<(), WebhookError> {
    let Some(plan_id) = &payment.plan_id else {
        error!(order_id = payment.order_id, "successful order has no plan set");
        return Ok(());
    };
    let Some(plan) = db::plan::get_by_id(plan_id, &ctx.db).await? else {
        error!(order_id = payment.order_id, plan_id, "plan vanished from catalog");
        return Ok(());
    };
    let Some(profile) = db::profile::get_by_id(&payment.profile_id, &ctx.db).await? else {
        error!(order_id = payment.order_id, "profile vanished before activation");
        return Ok(());
    };

    let profile = entitlement::activate(&profile, &plan, &ctx.db).await?;
    info!(
        order_id = payment.order_id,
        chat_id = profile.chat_id,
        plan = plan.code,
        expires_at = profile.subscription_expires_at.as_deref().unwrap_or("never"),
        "activated plan from payment"
    );
    Ok(())
}

#[derive(Deserialize)]
struct SuccessQuery {
    order_id: Option<String>,
}

/// Confirmation view after the gateway redirect. Unknown or missing order
/// ids still render the generic page.
async fn payment_success(
    State(ctx): State<AppContext>,
    Query(query): Query<SuccessQuery>,
) -> Response {
    let mut plan_line = String::new();

    if let Some(order_id) = &query.order_id {
        match db::payment::get_by_order_id(order_id, &ctx.db).await {
            Ok(Some(payment)) => {
                if let Some(plan_id) = &payment.plan_id {
                    if let Ok(Some(plan)) = db::plan::get_by_id(plan_id, &ctx.db).await {
                        plan_line = format!("<p>Plan: {}</p>", plan.name);
                    }
                }
                info!(order_id, "success page viewed");
            }
            Ok(None) => warn!(order_id, "success page for unknown order"),
            Err(err) => error!(order_id, "success page lookup failed: {}", err),
        }
    }

    let order_line = query
        .order_id
        .as_deref()
        .map(|id| format!("<p>Order: {}</p>", id))
        .unwrap_or_default();
    Html(format!(
        "<!DOCTYPE html>\n<html><body>\n<h1>Payment received</h1>\n{}{}\n\
         <p>You can return to the bot and draw your card.</p>\n</body></html>",
        order_line, plan_line
    ))
    .into_response()
}

#[cfg(test)]
mod test_webhook {
    use super::*;
    use crate::util::get_test_context;
    use axum_test::TestServer;
    use chrono::{Duration, Local};

    async fn get_test_server(ctx: AppContext) -> TestServer {
        TestServer::new(router(ctx)).unwrap()
    }

    /// Pending order for a known profile, returning (order_id, profile_id).
    async fn seed_order(ctx: &AppContext, chat_id: i64, plan_code: &str) -> (String, String) {
        let profile = db::profile::upsert(chat_id, Some("reader"), "Reader", &ctx.db)
            .await
            .unwrap();
        let plan = db::plan::get_active_by_code(plan_code, &ctx.db)
            .await
            .unwrap()
            .unwrap();
        let order_id = format!("ORDER_{}_{}_abcd1234", chat_id, plan_code);
        db::payment::create(&order_id, &profile.id, Some(&plan.id), plan.price, &ctx.db)
            .await
            .unwrap();
        (order_id, profile.id)
    }

    fn signed_form(ctx: &AppContext, fields: &[(&str, &str)]) -> BTreeMap<String, String> {
        let mut form: BTreeMap<String, String> = fields
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let signature = ctx.gateway.sign(&form).unwrap();
        form.insert("signature".to_owned(), signature);
        form
    }

    #[tokio::test]
    async fn it_should_reject_missing_fields() {
        let (ctx, _) = get_test_context().await;
        let server = get_test_server(ctx).await;

        let response = server
            .post("/payments/webhook")
            .form(&[("order_id", "ORDER_1_monthly_x")])
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn it_should_reject_a_tampered_signature_without_mutating() {
        let (ctx, _) = get_test_context().await;
        let (order_id, _) = seed_order(&ctx, 200, "monthly").await;
        let server = get_test_server(ctx.clone()).await;

        let mut form = signed_form(
            &ctx,
            &[("order_id", order_id.as_str()), ("payment_status", "success")],
        );
        form.insert("signature".to_owned(), "0".repeat(64));

        let response = server.post("/payments/webhook").form(&form).await;
        response.assert_status(StatusCode::FORBIDDEN);

        let order = db::payment::get_by_order_id(&order_id, &ctx.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, "pending");
        assert!(order.paid_at.is_none());

        let profile = db::profile::get_by_chat_id(200, &ctx.db).await.unwrap().unwrap();
        assert!(profile.plan_id.is_none());
    }

    #[tokio::test]
    async fn it_should_activate_the_plan_on_success() {
        let (ctx, _) = get_test_context().await;
        let (order_id, _) = seed_order(&ctx, 201, "monthly").await;
        let server = get_test_server(ctx.clone()).await;

        let form = signed_form(
            &ctx,
            &[
                ("order_id", order_id.as_str()),
                ("payment_status", "success"),
                ("payment_id", "pay-77"),
                ("customer_extra", "201"),
            ],
        );
        let response = server.post("/payments/webhook").form(&form).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["payment_status"], "success");

        let order = db::payment::get_by_order_id(&order_id, &ctx.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, "success");
        assert_eq!(order.payment_id.as_deref(), Some("pay-77"));
        assert!(order.paid_at.is_some());

        let profile = db::profile::get_by_chat_id(201, &ctx.db).await.unwrap().unwrap();
        let plan = entitlement::current_plan(&profile, &ctx.db).await.unwrap().unwrap();
        assert_eq!(plan.code, "monthly");
        let expected_day = (Local::now().naive_local() + Duration::days(30))
            .format("%Y-%m-%d")
            .to_string();
        assert!(
            profile
                .subscription_expires_at
                .unwrap()
                .starts_with(&expected_day)
        );
    }

    #[tokio::test]
    async fn it_should_apply_duplicate_success_deliveries_idempotently() {
        let (ctx, _) = get_test_context().await;
        let (order_id, profile_id) = seed_order(&ctx, 202, "monthly").await;
        let server = get_test_server(ctx.clone()).await;

        let form = signed_form(
            &ctx,
            &[("order_id", order_id.as_str()), ("payment_status", "success")],
        );
        server.post("/payments/webhook").form(&form).await.assert_status_ok();

        let first = db::payment::get_by_order_id(&order_id, &ctx.db)
            .await
            .unwrap()
            .unwrap();
        let paid_at = first.paid_at.clone().unwrap();

        // pin the expiry so a second activation would be visible
        let plan = db::plan::get_active_by_code("monthly", &ctx.db)
            .await
            .unwrap()
            .unwrap();
        db::profile::set_plan(
            &profile_id,
            &plan.id,
            Some("2099-01-01 00:00:00".to_owned()),
            &ctx.db,
        )
        .await
        .unwrap();

        // identical delivery again, with a new gateway payment id
        let form = signed_form(
            &ctx,
            &[
                ("order_id", order_id.as_str()),
                ("payment_status", "success"),
                ("payment_id", "pay-duplicate"),
            ],
        );
        server.post("/payments/webhook").form(&form).await.assert_status_ok();

        let second = db::payment::get_by_order_id(&order_id, &ctx.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.status, "success");
        // the stamp is not refreshed, only the audit payload is
        assert_eq!(second.paid_at.as_deref(), Some(paid_at.as_str()));
        assert_ne!(second.webhook_payload, first.webhook_payload);

        let profile = db::profile::get_by_id(&profile_id, &ctx.db).await.unwrap().unwrap();
        assert_eq!(
            profile.subscription_expires_at.as_deref(),
            Some("2099-01-01 00:00:00")
        );
    }

    #[tokio::test]
    async fn it_should_404_an_unknown_order_without_a_correlation_hint() {
        let (ctx, _) = get_test_context().await;
        let server = get_test_server(ctx.clone()).await;

        let form = signed_form(
            &ctx,
            &[("order_id", "ORDER_999_monthly_dead"), ("payment_status", "success")],
        );
        let response = server.post("/payments/webhook").form(&form).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn it_should_recover_an_unknown_order_through_customer_extra() {
        let (ctx, _) = get_test_context().await;
        db::profile::upsert(203, None, "Reader", &ctx.db).await.unwrap();
        let server = get_test_server(ctx.clone()).await;

        let form = signed_form(
            &ctx,
            &[
                ("order_id", "ORDER_203_monthly_beef"),
                ("payment_status", "success"),
                ("customer_extra", "203"),
            ],
        );
        let response = server.post("/payments/webhook").form(&form).await;
        response.assert_status_ok();

        // the materialized order has no plan: entitlement stays untouched
        let order = db::payment::get_by_order_id("ORDER_203_monthly_beef", &ctx.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, "success");
        assert!(order.plan_id.is_none());

        let profile = db::profile::get_by_chat_id(203, &ctx.db).await.unwrap().unwrap();
        assert!(profile.plan_id.is_none());
    }

    #[tokio::test]
    async fn it_should_render_the_success_page_tolerantly() {
        let (ctx, _) = get_test_context().await;
        let (order_id, _) = seed_order(&ctx, 204, "monthly").await;
        let server = get_test_server(ctx.clone()).await;

        let response = server
            .get("/payments/success")
            .add_query_param("order_id", &order_id)
            .await;
        response.assert_status_ok();
        assert!(response.text().contains("Monthly premium"));

        // unknown and missing order ids still render
        server
            .get("/payments/success")
            .add_query_param("order_id", "ORDER_unknown")
            .await
            .assert_status_ok();
        server.get("/payments/success").await.assert_status_ok();

        // only GET is accepted
        let response = server.post("/payments/success").await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }
}

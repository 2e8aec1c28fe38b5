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
use rand::seq::SliceRandom;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, warn};

use super::data::TransientContext;
use super::event::{InboundContent, InboundMessage};
use super::transition::{Effect, transition};
use crate::context::AppContext;
use crate::db::{self, entities::profile};
use crate::{cards, entitlement, reminder};
use arcana_common::error::{ArcanaError, Result};

/// Single entry point for one inbound chat update. Commands are routed
/// first; everything else feeds the state machine of the active attempt.
pub async fn process_message(ctx: &AppContext, msg: &InboundMessage) -> Result<()> {
    match msg.command() {
        Some("start") => handle_start(ctx, msg).await,
        Some("subscribe") => handle_subscribe(ctx, msg).await,
        Some("stats") => handle_stats(ctx, msg).await,
        Some("notify_all") => handle_notify_all(ctx, msg).await,
        Some("terms") => {
            ctx.channel
                .send_page_button(
                    msg.chat_id,
                    &ctx.messages.terms_text,
                    &ctx.messages.terms_button,
                    &ctx.settings.terms_url,
                )
                .await
        }
        Some("privacy") => {
            ctx.channel
                .send_page_button(
                    msg.chat_id,
                    &ctx.messages.privacy_text,
                    &ctx.messages.privacy_button,
                    &ctx.settings.privacy_url,
                )
                .await
        }
        Some(other) => {
            debug!(chat_id = msg.chat_id, command = other, "unknown command");
            Ok(())
        }
        None => match &msg.content {
            InboundContent::WebAppData(payload) => handle_plan_selection(ctx, msg, payload).await,
            _ => advance(ctx, msg).await,
        },
    }
}

/// The entry gate: profile upsert, free-tier default, then blocked, staff
/// and quota checks, strictly in that order, before the first prompt goes
/// out.
async fn handle_start(ctx: &AppContext, msg: &InboundMessage) -> Result<()> {
    info!(
        chat_id = msg.chat_id,
        username = msg.username.as_deref().unwrap_or(""),
        "new start"
    );

    let profile = db::profile::upsert(
        msg.chat_id,
        msg.username.as_deref(),
        &msg.first_name,
        &ctx.db,
    )
    .await?;
    let profile = entitlement::ensure_default_plan(profile, &ctx.db).await?;

    if profile.is_blocked {
        // blocked profiles get no feedback channel at all
        warn!(chat_id = msg.chat_id, "blocked profile ignored at entry");
        return Ok(());
    }

    if !profile.is_staff && !entitlement::can_start_session(&profile, &ctx.db).await? {
        let quota = entitlement::daily_quota(&profile, &ctx.db).await?;
        let plan = entitlement::current_plan(&profile, &ctx.db).await?;
        let on_free_tier =
            plan.as_ref().map(|p| p.code == entitlement::FREE_PLAN_CODE) != Some(false);

        info!(chat_id = msg.chat_id, quota, on_free_tier, "quota exhausted");

        let copy = if on_free_tier {
            &ctx.messages.quota_free
        } else {
            &ctx.messages.quota_paid
        };
        let copy = copy.replace("{limit}", &quota.to_string());
        ctx.channel.send_text(msg.chat_id, &copy, None).await?;
        return Ok(());
    }

    ctx.channel
        .send_text(msg.chat_id, &ctx.messages.welcome, None)
        .await?;
    let context = TransientContext::new();
    db::state_log::create(
        &profile.id,
        &context.step.name(),
        Some(context.step.description()),
        &ctx.db,
    )
    .await?;
    ctx.contexts.insert(msg.chat_id, context);
    Ok(())
}

async fn handle_subscribe(ctx: &AppContext, msg: &InboundMessage) -> Result<()> {
    let Some(profile) = db::profile::get_by_chat_id(msg.chat_id, &ctx.db).await? else {
        return ctx
            .channel
            .send_text(msg.chat_id, &ctx.messages.profile_missing, None)
            .await;
    };

    let plan = entitlement::current_plan(&profile, &ctx.db).await?;
    let copy = match (&plan, &profile.subscription_expires_at) {
        (Some(plan), Some(expires_at)) if plan.code != entitlement::FREE_PLAN_CODE => ctx
            .messages
            .subscribe_current
            .replace("{plan}", &plan.name)
            .replace("{expires}", expires_at),
        _ => ctx.messages.subscribe_intro.clone(),
    };

    ctx.channel
        .send_page_button(
            msg.chat_id,
            &copy,
            &ctx.messages.plan_picker_button,
            &ctx.settings.webapp_url,
        )
        .await
}

/// Embedded-page payload: `{"plan": "<code>"}`. Creates the pending order
/// and hands back the signed payment link.
async fn handle_plan_selection(
    ctx: &AppContext,
    msg: &InboundMessage,
    payload: &str,
) -> Result<()> {
    info!(chat_id = msg.chat_id, "received plan selection");

    let Some(profile) = db::profile::get_by_chat_id(msg.chat_id, &ctx.db).await? else {
        return ctx
            .channel
            .send_text(msg.chat_id, &ctx.messages.profile_missing, None)
            .await;
    };

    let parsed: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => {
            warn!(chat_id = msg.chat_id, "bad plan payload: {}", err);
            return ctx
                .channel
                .send_text(msg.chat_id, &ctx.messages.plan_unknown, None)
                .await;
        }
    };
    let Some(plan_code) = parsed.get("plan").and_then(|v| v.as_str()) else {
        return ctx
            .channel
            .send_text(msg.chat_id, &ctx.messages.plan_unknown, None)
            .await;
    };

    let Some(plan) = db::plan::get_active_by_code(plan_code, &ctx.db).await? else {
        warn!(chat_id = msg.chat_id, plan_code, "unknown plan selected");
        return ctx
            .channel
            .send_text(msg.chat_id, &ctx.messages.plan_unknown, None)
            .await;
    };

    let order_id = ctx.gateway.generate_order_id(msg.chat_id, &plan.code);
    let created: Result<String> = async {
        db::payment::create(&order_id, &profile.id, Some(&plan.id), plan.price, &ctx.db).await?;
        ctx.gateway
            .create_payment_link(&order_id, &plan, msg.chat_id, msg.username.as_deref())
    }
    .await;

    match created {
        Ok(link) => {
            let copy = ctx
                .messages
                .order_created
                .replace("{plan}", &plan.name)
                .replace("{order}", &order_id);
            ctx.channel
                .send_link_button(msg.chat_id, &copy, &ctx.messages.pay_button, &link)
                .await
        }
        Err(err) => {
            error!(chat_id = msg.chat_id, order_id, "order creation failed: {}", err);
            ctx.channel
                .send_text(msg.chat_id, &ctx.messages.order_failed, None)
                .await
        }
    }
}

async fn handle_stats(ctx: &AppContext, msg: &InboundMessage) -> Result<()> {
    let Some(profile) = db::profile::get_by_chat_id(msg.chat_id, &ctx.db).await? else {
        return Ok(());
    };
    if !profile.is_staff {
        return Ok(());
    }

    let week_ago = (Local::now().naive_local() - Duration::days(7))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let total = db::profile::count(&ctx.db).await?;
    let recent = db::profile::count_created_since(&week_ago, &ctx.db).await?;
    let completed = db::session::count_completed(&ctx.db).await?;

    let stats = format!(
        "Profiles: {}\nNew in the last 7 days: {}\nCompleted readings: {}",
        total, recent, completed
    );
    ctx.channel.send_text(msg.chat_id, &stats, None).await
}

/// Staff broadcast of the re-engagement nudge. Failures are counted per
/// recipient and never abort the batch.
async fn handle_notify_all(ctx: &AppContext, msg: &InboundMessage) -> Result<()> {
    let Some(profile) = db::profile::get_by_chat_id(msg.chat_id, &ctx.db).await? else {
        return Ok(());
    };
    if !profile.is_staff {
        return ctx
            .channel
            .send_text(msg.chat_id, &ctx.messages.not_allowed, None)
            .await;
    }

    let mut sent = 0u32;
    let mut failed = 0u32;
    for chat_id in db::profile::list_chat_ids(&ctx.db).await? {
        match ctx
            .channel
            .send_text(chat_id, &ctx.messages.reminder, None)
            .await
        {
            Ok(()) => sent += 1,
            Err(err) => {
                error!(chat_id, "broadcast delivery failed: {}", err);
                failed += 1;
            }
        }
    }

    let summary = format!("Messages sent: {}\nDelivery failures: {}", sent, failed);
    ctx.channel.send_text(msg.chat_id, &summary, None).await
}

/// Feeds one non-command update to the state machine and realizes the
/// resulting effects in order.
async fn advance(ctx: &AppContext, msg: &InboundMessage) -> Result<()> {
    let Some(profile) = db::profile::get_by_chat_id(msg.chat_id, &ctx.db).await? else {
        debug!(chat_id = msg.chat_id, "message from unknown profile ignored");
        return Ok(());
    };
    let Some(mut context) = ctx.contexts.get(msg.chat_id) else {
        debug!(chat_id = msg.chat_id, "no active attempt");
        return Ok(());
    };

    let current = context.step;
    let next = transition(current, msg, &context, &ctx.messages);
    if next.next == current && next.effects.is_empty() {
        debug!(chat_id = msg.chat_id, step = %current.name(), "input ignored");
        return Ok(());
    }

    apply_effects(ctx, &profile, &mut context, next.effects).await?;

    if next.next != current {
        info!(
            chat_id = msg.chat_id,
            from = %current.name(),
            to = %next.next.name(),
            "state change"
        );
        db::state_log::create(
            &profile.id,
            &next.next.name(),
            Some(next.next.description()),
            &ctx.db,
        )
        .await?;
    }
    context.step = next.next;
    ctx.contexts.insert(msg.chat_id, context);
    Ok(())
}

async fn apply_effects(
    ctx: &AppContext,
    profile: &profile::Model,
    context: &mut TransientContext,
    effects: Vec<Effect>,
) -> Result<()> {
    for effect in effects {
        match effect {
            Effect::Say { text, keyboard } => {
                ctx.channel
                    .send_text(profile.chat_id, &text, keyboard.as_deref())
                    .await?;
            }
            Effect::Remember { key, value } => {
                context.answers.insert(key, value);
            }
            Effect::SetCategory(category) => context.category = Some(category),
            Effect::SetCardStyle(style) => context.card_style = Some(style),
            Effect::DrawCard => draw_card(ctx, profile, context).await?,
            Effect::Encourage => {
                let line = ctx
                    .messages
                    .encouragements
                    .choose(&mut rand::thread_rng())
                    .cloned();
                if let Some(line) = line {
                    ctx.channel
                        .send_text(profile.chat_id, &line, None)
                        .await?;
                }
            }
            Effect::OfferConsultation => {
                ctx.channel
                    .send_link_button(
                        profile.chat_id,
                        &ctx.messages.closing,
                        &ctx.messages.consultation_button,
                        &ctx.settings.consultant_url,
                    )
                    .await?;
            }
            Effect::CompleteSession => {
                db::session::complete_latest_open(&profile.id, &ctx.db).await?;
            }
        }
    }
    Ok(())
}

/// The card draw: pool resolution against the plan's limit and the images
/// actually on disk, one uniform draw, the attempt row, the photo, and the
/// detached reminder.
async fn draw_card(
    ctx: &AppContext,
    profile: &profile::Model,
    context: &TransientContext,
) -> Result<()> {
    let style = context
        .card_style
        .clone()
        .ok_or_else(|| ArcanaError::Conversation("card style not chosen".to_owned()))?;

    let limit = entitlement::available_card_limit(profile, &ctx.db).await?;
    let available = cards::available_cards(&ctx.settings.media_root, &style)?;
    let pool = cards::pool_size(available, limit)?;
    let index = cards::draw(pool);

    db::session::create(
        &profile.id,
        context.answer(super::data::AnswerKey::Topic).unwrap_or(""),
        context.category.as_deref().unwrap_or(""),
        &style,
        index as i32,
        &ctx.db,
    )
    .await?;

    info!(chat_id = profile.chat_id, style, index, pool, "card drawn");

    let path = cards::card_path(&ctx.settings.media_root, &style, index);
    ctx.channel
        .send_photo(profile.chat_id, &path, &ctx.messages.card_caption)
        .await?;

    reminder::schedule_one_shot(
        ctx.channel.clone(),
        profile.chat_id,
        StdDuration::from_secs(ctx.settings.reminder_hours * 60 * 60),
        ctx.messages.reminder.clone(),
    );
    Ok(())
}

#[cfg(test)]
mod test_interpret {
    use super::*;
    use crate::channels::memory::Outbound;
    use crate::conversation::Step;
    use crate::util::{get_test_context, seed_deck};
    use sea_orm::{ActiveModelTrait, ActiveValue};

    async fn start(ctx: &AppContext, chat_id: i64) {
        process_message(ctx, &InboundMessage::text(chat_id, Some("reader"), "Reader", "/start"))
            .await
            .unwrap();
    }

    async fn say(ctx: &AppContext, chat_id: i64, text: &str) {
        process_message(ctx, &InboundMessage::text(chat_id, Some("reader"), "Reader", text))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn it_should_open_a_fresh_profile_on_the_free_plan() {
        let (ctx, channel) = get_test_context().await;
        start(&ctx, 100).await;

        let profile = db::profile::get_by_chat_id(100, &ctx.db).await.unwrap().unwrap();
        let plan = entitlement::current_plan(&profile, &ctx.db).await.unwrap().unwrap();
        assert_eq!(plan.code, "free");

        let sent = channel.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text(), Some(ctx.messages.welcome.as_str()));
        assert_eq!(ctx.contexts.get(100).unwrap().step, Step::AwaitingTopic);

        let log = db::state_log::get_by_profile(&profile.id, None, None, &ctx.db)
            .await
            .unwrap();
        assert_eq!(log[0].state_name, "awaiting_topic");
    }

    #[tokio::test]
    async fn it_should_upsell_an_exhausted_free_profile() {
        let (ctx, channel) = get_test_context().await;
        start(&ctx, 101).await;
        channel.take();

        let profile = db::profile::get_by_chat_id(101, &ctx.db).await.unwrap().unwrap();
        db::session::create(&profile.id, "r", "coaching", "day", 1, &ctx.db)
            .await
            .unwrap();

        start(&ctx, 101).await;
        let sent = channel.take();
        assert_eq!(sent.len(), 1);
        let text = sent[0].text().unwrap();
        assert!(text.contains("/subscribe"), "expected upsell copy, got: {}", text);
        // the gate does not advance or reset anything
        assert_eq!(ctx.contexts.get(101).unwrap().step, Step::AwaitingTopic);
    }

    #[tokio::test]
    async fn it_should_turn_away_an_exhausted_paid_profile_differently() {
        let (ctx, channel) = get_test_context().await;
        start(&ctx, 102).await;
        channel.take();

        let profile = db::profile::get_by_chat_id(102, &ctx.db).await.unwrap().unwrap();
        let monthly = db::plan::get_active_by_code("monthly", &ctx.db)
            .await
            .unwrap()
            .unwrap();
        let profile = entitlement::activate(&profile, &monthly, &ctx.db).await.unwrap();
        for _ in 0..3 {
            db::session::create(&profile.id, "r", "coaching", "day", 1, &ctx.db)
                .await
                .unwrap();
        }

        start(&ctx, 102).await;
        let sent = channel.take();
        assert_eq!(sent.len(), 1);
        let text = sent[0].text().unwrap();
        assert!(!text.contains("/subscribe"));
        assert!(text.contains("tomorrow"));
    }

    #[tokio::test]
    async fn it_should_silently_ignore_blocked_profiles() {
        let (ctx, channel) = get_test_context().await;
        start(&ctx, 103).await;
        channel.take();

        let profile = db::profile::get_by_chat_id(103, &ctx.db).await.unwrap().unwrap();
        let mut blocked: crate::db::entities::profile::ActiveModel = profile.into();
        blocked.is_blocked = ActiveValue::Set(true);
        blocked.update(&ctx.db).await.unwrap();

        start(&ctx, 103).await;
        assert!(channel.take().is_empty());
    }

    #[tokio::test]
    async fn it_should_let_staff_bypass_the_quota() {
        let (ctx, channel) = get_test_context().await;
        start(&ctx, 104).await;
        channel.take();

        let profile = db::profile::get_by_chat_id(104, &ctx.db).await.unwrap().unwrap();
        db::session::create(&profile.id, "r", "coaching", "day", 1, &ctx.db)
            .await
            .unwrap();
        let mut staff: crate::db::entities::profile::ActiveModel = profile.into();
        staff.is_staff = ActiveValue::Set(true);
        staff.update(&ctx.db).await.unwrap();

        start(&ctx, 104).await;
        let sent = channel.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text(), Some(ctx.messages.welcome.as_str()));
    }

    #[tokio::test]
    async fn it_should_run_a_complete_reading() {
        let (ctx, channel) = get_test_context().await;
        seed_deck(&ctx.settings.media_root, "day", 12);

        start(&ctx, 105).await;
        say(&ctx, 105, "my week has been heavy").await;
        say(&ctx, 105, "Therapeutic").await;
        // off-enumeration input parks the profile in place
        say(&ctx, 105, "Dawn").await;
        assert_eq!(ctx.contexts.get(105).unwrap().step, Step::AwaitingCardStyle);
        say(&ctx, 105, "Day").await;
        say(&ctx, 105, "I'm ready").await;

        let context = ctx.contexts.get(105).unwrap();
        assert_eq!(context.step, Step::Reflect(1));

        for answer in ["unease", "a river", "the child", "the shadow", "longing", "a crossing"] {
            say(&ctx, 105, answer).await;
        }
        assert_eq!(ctx.contexts.get(105).unwrap().step, Step::SimilarityCheck);
        say(&ctx, 105, "Yes").await;
        say(&ctx, 105, "OK").await;
        say(&ctx, 105, "calmer now").await;
        say(&ctx, 105, "talk to them").await;
        say(&ctx, 105, "go on").await;
        say(&ctx, 105, "Yes").await;

        assert_eq!(ctx.contexts.get(105).unwrap().step, Step::Terminal);

        let sent = channel.take();
        // exactly one media attachment over the whole reading
        let photos: Vec<_> = sent
            .iter()
            .filter(|o| matches!(o, Outbound::Photo { .. }))
            .collect();
        assert_eq!(photos.len(), 1);
        if let Outbound::Photo { path, .. } = photos[0] {
            let name = path.file_name().unwrap().to_string_lossy();
            let index: u32 = name.trim_end_matches(".jpg").parse().unwrap();
            // free plan: ten cards even though twelve are on disk
            assert!((1..=10).contains(&index));
        }
        // the consultation link closes the reading
        assert!(sent
            .iter()
            .any(|o| matches!(o, Outbound::LinkButton { .. })));

        // the recap replayed the topic and all six reflections and the
        // similarity answer
        let texts: Vec<_> = sent.iter().filter_map(|o| o.text()).collect();
        assert!(texts.contains(&"my week has been heavy"));
        assert!(texts.contains(&"a crossing"));
        assert!(texts.contains(&"Yes"));

        // the attempt row is completed
        let profile = db::profile::get_by_chat_id(105, &ctx.db).await.unwrap().unwrap();
        let sessions = db::session::get_by_profile(&profile.id, &ctx.db).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].card_category, "day");
        assert!(sessions[0].completed_at.is_some());

        // terminal state was logged
        let log = db::state_log::get_by_profile(&profile.id, None, None, &ctx.db)
            .await
            .unwrap();
        assert_eq!(log.last().unwrap().state_name, "terminal");
    }

    #[tokio::test]
    async fn it_should_create_an_order_from_a_plan_selection() {
        let (ctx, channel) = get_test_context().await;
        start(&ctx, 106).await;
        channel.take();

        process_message(
            &ctx,
            &InboundMessage::webapp(106, Some("reader"), "Reader", "{\"plan\":\"monthly\"}"),
        )
        .await
        .unwrap();

        let sent = channel.take();
        assert_eq!(sent.len(), 1);
        let Outbound::LinkButton { text, url, .. } = &sent[0] else {
            panic!("expected a payment link button, got {:?}", sent[0]);
        };
        assert!(text.contains("ORDER_106_monthly_"));
        assert!(url.contains("signature="));

        let order_id = text
            .lines()
            .find_map(|l| l.strip_prefix("Order: "))
            .unwrap();
        let order = db::payment::get_by_order_id(order_id, &ctx.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, "pending");
        assert_eq!(order.amount, 300);
        assert!(order.plan_id.is_some());
    }

    #[tokio::test]
    async fn it_should_reject_an_unknown_plan_selection() {
        let (ctx, channel) = get_test_context().await;
        start(&ctx, 107).await;
        channel.take();

        process_message(
            &ctx,
            &InboundMessage::webapp(107, None, "Reader", "{\"plan\":\"lifetime\"}"),
        )
        .await
        .unwrap();

        let sent = channel.take();
        assert_eq!(sent[0].text(), Some(ctx.messages.plan_unknown.as_str()));
    }

    #[tokio::test]
    async fn it_should_count_broadcast_failures_per_recipient() {
        let (ctx, channel) = get_test_context().await;
        start(&ctx, 108).await;
        start(&ctx, 109).await;
        start(&ctx, 110).await;
        channel.take();

        let profile = db::profile::get_by_chat_id(108, &ctx.db).await.unwrap().unwrap();
        let mut staff: crate::db::entities::profile::ActiveModel = profile.into();
        staff.is_staff = ActiveValue::Set(true);
        staff.update(&ctx.db).await.unwrap();

        channel.mark_unreachable(110);

        process_message(&ctx, &InboundMessage::text(108, None, "Reader", "/notify_all"))
            .await
            .unwrap();

        let sent = channel.take();
        let summary = sent.last().unwrap().text().unwrap();
        assert!(summary.contains("sent: 2"));
        assert!(summary.contains("failures: 1"));
    }

    #[tokio::test]
    async fn it_should_ignore_flow_input_without_an_active_attempt() {
        let (ctx, channel) = get_test_context().await;

        say(&ctx, 111, "hello?").await;
        assert!(channel.take().is_empty());
    }
}

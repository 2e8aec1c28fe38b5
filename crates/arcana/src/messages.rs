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

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use arcana_common::error::Result;

/// Every line the bot speaks, in script order. Deployments overlay their own
/// copy from a TOML file; the defaults keep the crate self-contained.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessageCatalog {
    /// First prompt of a fresh session: ask for the topic.
    pub welcome: String,
    /// Sent after the topic, with the category keyboard.
    pub choose_category: String,
    /// Introduction to the deck; the last entry asks for the card style.
    pub card_intro: Vec<String>,
    /// Sent after the style choice; the last entry carries the ready button.
    pub get_ready: Vec<String>,
    /// Caption under the drawn card image.
    pub card_caption: String,
    /// The first reflection question, sent right after the card.
    pub first_question: String,
    /// One batch of prompts per remaining reflection step, in order.
    pub reflect_followups: Vec<Vec<String>>,
    /// Asked once all reflections are in.
    pub similarity_question: Vec<String>,
    pub similarity_yes: String,
    pub similarity_no: String,
    /// Offer to replay the collected answers, with the OK button.
    pub recap_offer: String,
    pub recap_header: String,
    pub recap_footer: String,
    pub insight_first: String,
    pub insight_second: String,
    /// Yes/no question wrapping up the reading.
    pub follow_up_offer: String,
    /// Closing message carrying the consultation button.
    pub closing: String,
    pub consultation_button: String,
    /// One is drawn at random for the closing.
    pub encouragements: Vec<String>,
    pub reminder: String,
    /// Quota exhausted, free tier: upsell copy. `{limit}` is substituted.
    pub quota_free: String,
    /// Quota exhausted, paid tier: come back tomorrow. `{limit}` likewise.
    pub quota_paid: String,
    pub subscribe_intro: String,
    /// Shown to an active paid subscriber; `{plan}` and `{expires}` are
    /// substituted.
    pub subscribe_current: String,
    pub plan_picker_button: String,
    /// Confirmation after a plan pick; `{plan}` and `{order}` substituted.
    pub order_created: String,
    pub pay_button: String,
    pub plan_unknown: String,
    pub order_failed: String,
    pub profile_missing: String,
    pub not_allowed: String,
    pub terms_text: String,
    pub terms_button: String,
    pub privacy_text: String,
    pub privacy_button: String,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        MessageCatalog {
            welcome: "Hello! Tell me what is on your mind today. Describe the \
                      situation or question you want to work with."
                .to_owned(),
            choose_category: "Thank you. What kind of reading would you like?".to_owned(),
            card_intro: vec![
                "The deck holds images of everyday scenes and figures. There are \
                 no right or wrong readings, only what you see."
                    .to_owned(),
                "Take a breath and hold your request in mind.".to_owned(),
                "Which card will you draw, a day card or a night card?".to_owned(),
            ],
            get_ready: vec![
                "We will look at the card slowly, step by step.".to_owned(),
                "Press the button when you are ready to begin.".to_owned(),
            ],
            card_caption: "Here is your card.".to_owned(),
            first_question: "Look at it for a moment. What feelings does it stir?".to_owned(),
            reflect_followups: vec![
                vec!["What do you see happening in the image?".to_owned()],
                vec![
                    "Now look at the figures.".to_owned(),
                    "Which of them feels pleasant to you? Describe them.".to_owned(),
                ],
                vec![
                    "And the opposite.".to_owned(),
                    "Which figure is unpleasant or uncomfortable?".to_owned(),
                    "Describe them too.".to_owned(),
                ],
                vec![
                    "Stay with the figures a little longer.".to_owned(),
                    "What might they be feeling?".to_owned(),
                    "Say it as if you were each of them.".to_owned(),
                ],
                vec![
                    "Step back and take in the whole scene.".to_owned(),
                    "What is going on here, in one or two sentences?".to_owned(),
                ],
            ],
            similarity_question: vec![
                "Thank you for staying with it.".to_owned(),
                "Does what you described resemble your real situation?".to_owned(),
            ],
            similarity_yes: "It often does. The card only returns what you brought to it."
                .to_owned(),
            similarity_no: "That is fine too. Sometimes the distance itself is the answer."
                .to_owned(),
            recap_offer: "Let me show you everything you said, side by side.".to_owned(),
            recap_header: "Here are your own words:".to_owned(),
            recap_footer: "Read them once more, slowly.".to_owned(),
            insight_first: "What feelings come up as you read them?".to_owned(),
            insight_second: "And what could you do, even in a small way, about the situation?"
                .to_owned(),
            follow_up_offer: "Did you find a hint for yourself today?".to_owned(),
            closing: "If you would like to go deeper with a guide, you can book a \
                      consultation."
                .to_owned(),
            consultation_button: "Book a consultation".to_owned(),
            encouragements: vec![
                "You did good work today.".to_owned(),
                "Be gentle with yourself.".to_owned(),
                "Whatever you saw in the card was already in you.".to_owned(),
            ],
            reminder: "Ready to draw a new card and get a hint for today? Press /start"
                .to_owned(),
            quota_free: "You have used your daily limit ({limit} session).\n\nWant more \
                         sessions per day? A premium plan gives you 3 sessions a day and \
                         the full deck.\n\nUse /subscribe to pick a plan."
                .to_owned(),
            quota_paid: "You have used your daily limit ({limit} sessions).\nCome back \
                         tomorrow!"
                .to_owned(),
            subscribe_intro: "Choose a plan to subscribe:".to_owned(),
            subscribe_current: "Your plan: {plan}, active until {expires}.\n\nTo extend it, \
                                pick a plan below."
                .to_owned(),
            plan_picker_button: "Choose a plan".to_owned(),
            order_created: "Subscription: {plan}\nOrder: {order}\n\nPress the button below \
                            to pay."
                .to_owned(),
            pay_button: "Go to payment".to_owned(),
            plan_unknown: "That plan is not available. Please pick one from the list."
                .to_owned(),
            order_failed: "Something went wrong while creating your order. Please try again \
                           later."
                .to_owned(),
            profile_missing: "I do not know you yet, press /start first.".to_owned(),
            not_allowed: "You are not allowed to run this command.".to_owned(),
            terms_text: "Public offer".to_owned(),
            terms_button: "Open the offer".to_owned(),
            privacy_text: "Privacy policy".to_owned(),
            privacy_button: "Open the policy".to_owned(),
        }
    }
}

impl MessageCatalog {
    /// Defaults overlaid by an optional TOML file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(MessageCatalog::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        Ok(figment.extract()?)
    }
}

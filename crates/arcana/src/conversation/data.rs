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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Button texts that gate the enumerated steps. The stored value is the
/// lowercased button text; card style doubles as the media subdirectory.
pub const REQUEST_CATEGORIES: [&str; 2] = ["Therapeutic", "Coaching"];
pub const CARD_STYLES: [&str; 2] = ["Day", "Night"];
pub const READY_BUTTON: &str = "I'm ready";
pub const OK_BUTTON: &str = "OK";
pub const YES_NO: [&str; 2] = ["Yes", "No"];

/// One reading is a strictly forward walk through these steps; no
/// backtracking operation exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    AwaitingTopic,
    AwaitingCategory,
    AwaitingCardStyle,
    ReadyConfirm,
    Reflect(u8),
    SimilarityCheck,
    Recap,
    Insight(u8),
    FollowUpOffer,
    Closing,
    Terminal,
}

impl Step {
    pub fn name(&self) -> String {
        match self {
            Step::AwaitingTopic => "awaiting_topic".to_owned(),
            Step::AwaitingCategory => "awaiting_category".to_owned(),
            Step::AwaitingCardStyle => "awaiting_card_style".to_owned(),
            Step::ReadyConfirm => "ready_confirm".to_owned(),
            Step::Reflect(n) => format!("reflect_{}", n),
            Step::SimilarityCheck => "similarity_check".to_owned(),
            Step::Recap => "recap".to_owned(),
            Step::Insight(n) => format!("insight_{}", n),
            Step::FollowUpOffer => "follow_up_offer".to_owned(),
            Step::Closing => "closing".to_owned(),
            Step::Terminal => "terminal".to_owned(),
        }
    }

    /// Human description carried into the audit log.
    pub fn description(&self) -> &'static str {
        match self {
            Step::AwaitingTopic => "Waiting for the user's request",
            Step::AwaitingCategory => "Choosing the reading category",
            Step::AwaitingCardStyle => "Choosing the card style",
            Step::ReadyConfirm => "Confirming readiness to begin",
            Step::Reflect(1) => "Describing feelings stirred by the card",
            Step::Reflect(2) => "Describing what the card shows",
            Step::Reflect(3) => "Describing the pleasant figure",
            Step::Reflect(4) => "Describing the unpleasant figure",
            Step::Reflect(5) => "Describing what the figures feel",
            Step::Reflect(_) => "Describing the scene as a whole",
            Step::SimilarityCheck => "Comparing the card to the real situation",
            Step::Recap => "Replaying the collected answers",
            Step::Insight(1) => "Naming feelings about the answers",
            Step::Insight(_) => "Naming a possible next action",
            Step::FollowUpOffer => "Asking whether a hint was found",
            Step::Closing => "Closing the reading",
            Step::Terminal => "Reading finished",
        }
    }
}

/// Free-text answers collected over one attempt, keyed by their place in
/// the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerKey {
    Topic,
    Feelings,
    Imagery,
    Ally,
    Adversary,
    FigureFeelings,
    Narrative,
    Similarity,
}

/// Reflection answers in script order; `Reflect(n)` stores the n-th.
pub const REFLECT_KEYS: [AnswerKey; 6] = [
    AnswerKey::Feelings,
    AnswerKey::Imagery,
    AnswerKey::Ally,
    AnswerKey::Adversary,
    AnswerKey::FigureFeelings,
    AnswerKey::Narrative,
];

/// Fixed emission order of the recap, independent of map iteration order.
pub const RECAP_ORDER: [AnswerKey; 8] = [
    AnswerKey::Topic,
    AnswerKey::Feelings,
    AnswerKey::Imagery,
    AnswerKey::Ally,
    AnswerKey::Adversary,
    AnswerKey::FigureFeelings,
    AnswerKey::Narrative,
    AnswerKey::Similarity,
];

/// Scratch space for the active attempt. Exists only between the start
/// command and the terminal step; not durable business data.
#[derive(Debug, Clone)]
pub struct TransientContext {
    pub step: Step,
    pub category: Option<String>,
    pub card_style: Option<String>,
    pub answers: HashMap<AnswerKey, String>,
}

impl TransientContext {
    pub fn new() -> Self {
        TransientContext {
            step: Step::AwaitingTopic,
            category: None,
            card_style: None,
            answers: HashMap::new(),
        }
    }

    pub fn answer(&self, key: AnswerKey) -> Option<&str> {
        self.answers.get(&key).map(String::as_str)
    }

    /// Non-empty answers in [`RECAP_ORDER`]; empty or absent keys are
    /// skipped entirely.
    pub fn recap_lines(&self) -> Vec<String> {
        RECAP_ORDER
            .iter()
            .filter_map(|key| self.answers.get(key))
            .filter(|value| !value.trim().is_empty())
            .cloned()
            .collect()
    }
}

impl Default for TransientContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-profile transient contexts. One entry per chat id; replaced wholesale
/// when a new attempt starts.
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    inner: Arc<Mutex<HashMap<i64, TransientContext>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chat_id: i64) -> Option<TransientContext> {
        self.inner.lock().unwrap().get(&chat_id).cloned()
    }

    pub fn insert(&self, chat_id: i64, context: TransientContext) {
        self.inner.lock().unwrap().insert(chat_id, context);
    }

    pub fn remove(&self, chat_id: i64) {
        self.inner.lock().unwrap().remove(&chat_id);
    }
}

#[cfg(test)]
mod test_data {
    use super::*;

    #[test]
    fn it_should_emit_the_recap_in_fixed_order() {
        let mut context = TransientContext::new();
        // inserted out of script order on purpose
        context.answers.insert(AnswerKey::Narrative, "a storm".to_owned());
        context.answers.insert(AnswerKey::Topic, "my week".to_owned());
        context.answers.insert(AnswerKey::Feelings, "unease".to_owned());

        assert_eq!(context.recap_lines(), vec!["my week", "unease", "a storm"]);
    }

    #[test]
    fn it_should_skip_empty_answers_in_the_recap() {
        let mut context = TransientContext::new();
        context.answers.insert(AnswerKey::Topic, "my week".to_owned());
        context.answers.insert(AnswerKey::Feelings, "".to_owned());
        context.answers.insert(AnswerKey::Imagery, "  ".to_owned());
        context.answers.insert(AnswerKey::Similarity, "yes".to_owned());

        assert_eq!(context.recap_lines(), vec!["my week", "yes"]);
    }
}

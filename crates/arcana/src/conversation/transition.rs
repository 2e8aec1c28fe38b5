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

use super::data::{
    AnswerKey, CARD_STYLES, OK_BUTTON, READY_BUTTON, REFLECT_KEYS, REQUEST_CATEGORIES, Step,
    TransientContext, YES_NO,
};
use super::event::InboundMessage;
use crate::messages::MessageCatalog;

/// What the interpreter must do, in order, to realize one transition. The
/// impure pieces (dice, clock, database, transport) stay behind the
/// interpreter; this module only decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Say {
        text: String,
        keyboard: Option<Vec<String>>,
    },
    Remember {
        key: AnswerKey,
        value: String,
    },
    SetCategory(String),
    SetCardStyle(String),
    /// Resolve the pool, draw, open the attempt, send the card image and
    /// schedule the one-shot reminder.
    DrawCard,
    /// One random encouragement line.
    Encourage,
    /// The closing message with the consultation link button.
    OfferConsultation,
    CompleteSession,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: Step,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(step: Step) -> Self {
        Transition {
            next: step,
            effects: vec![],
        }
    }
}

fn say(text: &str) -> Effect {
    Effect::Say {
        text: text.to_owned(),
        keyboard: None,
    }
}

fn say_with_row(text: &str, row: &[&str]) -> Effect {
    Effect::Say {
        text: text.to_owned(),
        keyboard: Some(row.iter().map(|s| (*s).to_owned()).collect()),
    }
}

fn is_yes(text: &str) -> bool {
    text.to_lowercase().contains(&YES_NO[0].to_lowercase())
}

/// The machine is purely forward-moving: every inbound text maps to at most
/// one step ahead. Unmatched input (wrong content kind, or text outside the
/// enumerations at the two gated steps) produces no effects and leaves the
/// profile parked where it was.
pub fn transition(
    step: Step,
    event: &InboundMessage,
    context: &TransientContext,
    messages: &MessageCatalog,
) -> Transition {
    let Some(text) = event.plain_text() else {
        return Transition::stay(step);
    };

    match step {
        Step::AwaitingTopic => Transition {
            next: Step::AwaitingCategory,
            effects: vec![
                Effect::Remember {
                    key: AnswerKey::Topic,
                    value: text.to_owned(),
                },
                say_with_row(&messages.choose_category, &REQUEST_CATEGORIES),
            ],
        },

        Step::AwaitingCategory => {
            if !REQUEST_CATEGORIES.contains(&text) {
                return Transition::stay(step);
            }
            let mut effects = vec![Effect::SetCategory(text.to_lowercase())];
            let (last, intro) = match messages.card_intro.split_last() {
                Some(split) => split,
                None => return Transition::stay(step),
            };
            effects.extend(intro.iter().map(|line| say(line)));
            effects.push(say_with_row(last, &CARD_STYLES));
            Transition {
                next: Step::AwaitingCardStyle,
                effects,
            }
        }

        Step::AwaitingCardStyle => {
            if !CARD_STYLES.contains(&text) {
                return Transition::stay(step);
            }
            let mut effects = vec![Effect::SetCardStyle(text.to_lowercase())];
            let (last, rest) = match messages.get_ready.split_last() {
                Some(split) => split,
                None => return Transition::stay(step),
            };
            effects.extend(rest.iter().map(|line| say(line)));
            effects.push(say_with_row(last, &[READY_BUTTON]));
            Transition {
                next: Step::ReadyConfirm,
                effects,
            }
        }

        Step::ReadyConfirm => Transition {
            next: Step::Reflect(1),
            effects: vec![Effect::DrawCard, say(&messages.first_question)],
        },

        Step::Reflect(n) => {
            let index = usize::from(n).clamp(1, REFLECT_KEYS.len());
            let mut effects = vec![Effect::Remember {
                key: REFLECT_KEYS[index - 1],
                value: text.to_owned(),
            }];

            if index < REFLECT_KEYS.len() {
                if let Some(batch) = messages.reflect_followups.get(index - 1) {
                    effects.extend(batch.iter().map(|line| say(line)));
                }
                Transition {
                    next: Step::Reflect(n + 1),
                    effects,
                }
            } else {
                if let Some((last, rest)) = messages.similarity_question.split_last() {
                    effects.extend(rest.iter().map(|line| say(line)));
                    effects.push(say_with_row(last, &YES_NO));
                }
                Transition {
                    next: Step::SimilarityCheck,
                    effects,
                }
            }
        }

        Step::SimilarityCheck => {
            // yes and no both move on; only the acknowledgment differs
            let acknowledgment = if is_yes(text) {
                &messages.similarity_yes
            } else {
                &messages.similarity_no
            };
            Transition {
                next: Step::Recap,
                effects: vec![
                    Effect::Remember {
                        key: AnswerKey::Similarity,
                        value: text.to_owned(),
                    },
                    say(acknowledgment),
                    say_with_row(&messages.recap_offer, &[OK_BUTTON]),
                ],
            }
        }

        Step::Recap => {
            let mut effects = vec![say(&messages.recap_header)];
            effects.extend(context.recap_lines().iter().map(|line| say(line)));
            effects.push(say(&messages.recap_footer));
            Transition {
                next: Step::Insight(1),
                effects,
            }
        }

        Step::Insight(1) => Transition {
            next: Step::Insight(2),
            effects: vec![say(&messages.insight_first)],
        },

        Step::Insight(_) => Transition {
            next: Step::FollowUpOffer,
            effects: vec![say(&messages.insight_second)],
        },

        Step::FollowUpOffer => Transition {
            next: Step::Closing,
            effects: vec![say_with_row(&messages.follow_up_offer, &YES_NO)],
        },

        Step::Closing => Transition {
            next: Step::Terminal,
            effects: vec![
                Effect::Encourage,
                Effect::OfferConsultation,
                Effect::CompleteSession,
            ],
        },

        Step::Terminal => Transition::stay(step),
    }
}

#[cfg(test)]
mod test_transition {
    use super::*;
    use crate::conversation::event::InboundContent;

    fn msg(text: &str) -> InboundMessage {
        InboundMessage::text(1, None, "Reader", text)
    }

    #[test]
    fn it_should_walk_the_happy_path_forward() {
        let messages = MessageCatalog::default();
        let mut context = TransientContext::new();

        let t = transition(Step::AwaitingTopic, &msg("my week"), &context, &messages);
        assert_eq!(t.next, Step::AwaitingCategory);

        let t = transition(t.next, &msg("Therapeutic"), &context, &messages);
        assert_eq!(t.next, Step::AwaitingCardStyle);

        let t = transition(t.next, &msg("Day"), &context, &messages);
        assert_eq!(t.next, Step::ReadyConfirm);

        let t = transition(t.next, &msg("I'm ready"), &context, &messages);
        assert_eq!(t.next, Step::Reflect(1));
        assert!(t.effects.contains(&Effect::DrawCard));

        let mut step = t.next;
        for _ in 0..6 {
            let t = transition(step, &msg("an answer"), &context, &messages);
            step = t.next;
        }
        assert_eq!(step, Step::SimilarityCheck);

        let t = transition(step, &msg("Yes"), &context, &messages);
        assert_eq!(t.next, Step::Recap);
        context
            .answers
            .insert(AnswerKey::Similarity, "Yes".to_owned());

        let t = transition(t.next, &msg("OK"), &context, &messages);
        assert_eq!(t.next, Step::Insight(1));

        let t = transition(t.next, &msg("calm"), &context, &messages);
        assert_eq!(t.next, Step::Insight(2));
        let t = transition(t.next, &msg("call her"), &context, &messages);
        assert_eq!(t.next, Step::FollowUpOffer);
        let t = transition(t.next, &msg("anything"), &context, &messages);
        assert_eq!(t.next, Step::Closing);

        let t = transition(t.next, &msg("Yes"), &context, &messages);
        assert_eq!(t.next, Step::Terminal);
        assert!(t.effects.contains(&Effect::CompleteSession));

        let t = transition(t.next, &msg("hello?"), &context, &messages);
        assert_eq!(t.next, Step::Terminal);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn it_should_park_on_input_outside_the_enumerations() {
        let messages = MessageCatalog::default();
        let context = TransientContext::new();

        let t = transition(Step::AwaitingCategory, &msg("whatever"), &context, &messages);
        assert_eq!(t.next, Step::AwaitingCategory);
        assert!(t.effects.is_empty());

        let t = transition(Step::AwaitingCardStyle, &msg("Dusk"), &context, &messages);
        assert_eq!(t.next, Step::AwaitingCardStyle);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn it_should_ignore_non_text_content() {
        let messages = MessageCatalog::default();
        let context = TransientContext::new();
        let event = InboundMessage {
            chat_id: 1,
            username: None,
            first_name: "Reader".to_owned(),
            content: InboundContent::Unsupported,
        };

        for step in [
            Step::AwaitingTopic,
            Step::AwaitingCategory,
            Step::Reflect(3),
            Step::Closing,
        ] {
            let t = transition(step, &event, &context, &messages);
            assert_eq!(t.next, step);
            assert!(t.effects.is_empty());
        }
    }

    #[test]
    fn it_should_vary_only_wording_on_the_similarity_answer() {
        let messages = MessageCatalog::default();
        let context = TransientContext::new();

        let yes = transition(Step::SimilarityCheck, &msg("Yes"), &context, &messages);
        let no = transition(Step::SimilarityCheck, &msg("No"), &context, &messages);

        assert_eq!(yes.next, Step::Recap);
        assert_eq!(no.next, Step::Recap);
        assert_ne!(yes.effects, no.effects);
    }

    #[test]
    fn it_should_replay_answers_in_the_recap() {
        let messages = MessageCatalog::default();
        let mut context = TransientContext::new();
        context.answers.insert(AnswerKey::Topic, "topic".to_owned());
        context
            .answers
            .insert(AnswerKey::Narrative, "a storm".to_owned());
        context.answers.insert(AnswerKey::Ally, "".to_owned());

        let t = transition(Step::Recap, &msg("OK"), &context, &messages);
        let texts: Vec<&str> = t
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::Say { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        // header, the two non-empty answers in fixed order, footer
        assert_eq!(
            texts,
            vec![
                messages.recap_header.as_str(),
                "topic",
                "a storm",
                messages.recap_footer.as_str(),
            ]
        );
    }
}

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

/// What the transport handed us, already stripped to the three content
/// kinds the engine reacts to. Everything else arrives as `Unsupported`
/// and is ignored in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundContent {
    Text(String),
    /// Structured payload posted back by an embedded page.
    WebAppData(String),
    Unsupported,
}

#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub content: InboundContent,
}

impl InboundMessage {
    pub fn text(chat_id: i64, username: Option<&str>, first_name: &str, text: &str) -> Self {
        InboundMessage {
            chat_id,
            username: username.map(str::to_owned),
            first_name: first_name.to_owned(),
            content: InboundContent::Text(text.to_owned()),
        }
    }

    pub fn webapp(chat_id: i64, username: Option<&str>, first_name: &str, data: &str) -> Self {
        InboundMessage {
            chat_id,
            username: username.map(str::to_owned),
            first_name: first_name.to_owned(),
            content: InboundContent::WebAppData(data.to_owned()),
        }
    }

    /// `/start`, `/subscribe@somebot args` → `start`, `subscribe`.
    pub fn command(&self) -> Option<&str> {
        let InboundContent::Text(text) = &self.content else {
            return None;
        };
        let rest = text.strip_prefix('/')?;
        let name = rest.split_whitespace().next().unwrap_or("");
        let name = name.split('@').next().unwrap_or("");
        if name.is_empty() { None } else { Some(name) }
    }

    /// Text that is not a command; the only input that advances the flow.
    pub fn plain_text(&self) -> Option<&str> {
        match &self.content {
            InboundContent::Text(text) if !text.starts_with('/') => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test_event {
    use super::*;

    #[test]
    fn it_should_parse_commands() {
        let msg = InboundMessage::text(1, None, "Reader", "/start");
        assert_eq!(msg.command(), Some("start"));
        assert_eq!(msg.plain_text(), None);

        let msg = InboundMessage::text(1, None, "Reader", "/subscribe@arcana_bot now");
        assert_eq!(msg.command(), Some("subscribe"));

        let msg = InboundMessage::text(1, None, "Reader", "just words");
        assert_eq!(msg.command(), None);
        assert_eq!(msg.plain_text(), Some("just words"));

        let msg = InboundMessage::webapp(1, None, "Reader", "{\"plan\":\"monthly\"}");
        assert_eq!(msg.command(), None);
        assert_eq!(msg.plain_text(), None);
    }
}

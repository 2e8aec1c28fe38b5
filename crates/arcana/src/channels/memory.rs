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

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::Channel;
use arcana_common::error::{ArcanaError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text {
        chat_id: i64,
        text: String,
        keyboard: Option<Vec<String>>,
    },
    Photo {
        chat_id: i64,
        path: PathBuf,
        caption: String,
    },
    LinkButton {
        chat_id: i64,
        text: String,
        label: String,
        url: String,
    },
    PageButton {
        chat_id: i64,
        text: String,
        label: String,
        url: String,
    },
}

impl Outbound {
    pub fn text(&self) -> Option<&str> {
        match self {
            Outbound::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Records every outbound message; chats marked unreachable make sends
/// fail. Backs the engine and dispatcher tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryChannel {
    sent: Arc<Mutex<Vec<Outbound>>>,
    unreachable: Arc<Mutex<HashSet<i64>>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_unreachable(&self, chat_id: i64) {
        self.unreachable.lock().unwrap().insert(chat_id);
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }

    /// Drains and returns everything recorded so far.
    pub fn take(&self) -> Vec<Outbound> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    fn deliver(&self, chat_id: i64, message: Outbound) -> Result<()> {
        if self.unreachable.lock().unwrap().contains(&chat_id) {
            return Err(ArcanaError::Channel(format!(
                "chat ({}) unreachable",
                chat_id
            )));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&[String]>,
    ) -> Result<()> {
        self.deliver(
            chat_id,
            Outbound::Text {
                chat_id,
                text: text.to_owned(),
                keyboard: keyboard.map(<[String]>::to_vec),
            },
        )
    }

    async fn send_photo(&self, chat_id: i64, path: &Path, caption: &str) -> Result<()> {
        self.deliver(
            chat_id,
            Outbound::Photo {
                chat_id,
                path: path.to_owned(),
                caption: caption.to_owned(),
            },
        )
    }

    async fn send_link_button(
        &self,
        chat_id: i64,
        text: &str,
        label: &str,
        url: &str,
    ) -> Result<()> {
        self.deliver(
            chat_id,
            Outbound::LinkButton {
                chat_id,
                text: text.to_owned(),
                label: label.to_owned(),
                url: url.to_owned(),
            },
        )
    }

    async fn send_page_button(
        &self,
        chat_id: i64,
        text: &str,
        label: &str,
        url: &str,
    ) -> Result<()> {
        self.deliver(
            chat_id,
            Outbound::PageButton {
                chat_id,
                text: text.to_owned(),
                label: label.to_owned(),
                url: url.to_owned(),
            },
        )
    }
}

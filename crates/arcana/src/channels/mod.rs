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

pub mod echo;
pub mod memory;

use async_trait::async_trait;
use std::path::Path;

use arcana_common::error::Result;

/// Outbound side of the chat transport. The conversation engine only ever
/// needs these four primitives; binding them to a concrete messenger API
/// happens outside this crate.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Plain text. `keyboard` of `Some(row)` offers one row of reply
    /// buttons; `None` clears any previously offered row.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&[String]>,
    ) -> Result<()>;

    async fn send_photo(&self, chat_id: i64, path: &Path, caption: &str) -> Result<()>;

    /// Message with a single URL button underneath.
    async fn send_link_button(
        &self,
        chat_id: i64,
        text: &str,
        label: &str,
        url: &str,
    ) -> Result<()>;

    /// Message with a button opening an embedded page (the plan picker,
    /// terms, privacy policy).
    async fn send_page_button(
        &self,
        chat_id: i64,
        text: &str,
        label: &str,
        url: &str,
    ) -> Result<()>;
}

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
use std::path::Path;
use tracing::info;

use super::Channel;
use arcana_common::error::Result;

/// Writes outbound traffic to the log instead of a messenger. Stands in
/// when the server runs without a transport binding attached.
#[derive(Debug, Default, Clone)]
pub struct EchoChannel;

#[async_trait]
impl Channel for EchoChannel {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&[String]>,
    ) -> Result<()> {
        info!(chat_id, ?keyboard, "send text: {}", text);
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, path: &Path, caption: &str) -> Result<()> {
        info!(chat_id, path = %path.display(), "send photo: {}", caption);
        Ok(())
    }

    async fn send_link_button(
        &self,
        chat_id: i64,
        text: &str,
        label: &str,
        url: &str,
    ) -> Result<()> {
        info!(chat_id, label, url, "send link button: {}", text);
        Ok(())
    }

    async fn send_page_button(
        &self,
        chat_id: i64,
        text: &str,
        label: &str,
        url: &str,
    ) -> Result<()> {
        info!(chat_id, label, url, "send page button: {}", text);
        Ok(())
    }
}

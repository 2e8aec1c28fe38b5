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

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::channels::Channel;

/// One detached best-effort nudge per card draw. The task outlives the
/// triggering handler, is never retried, and is not cancelled when the
/// profile moves on or finishes; delivery failure is logged and swallowed.
pub fn schedule_one_shot(
    channel: Arc<dyn Channel>,
    chat_id: i64,
    delay: Duration,
    text: String,
) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match channel.send_text(chat_id, &text, None).await {
            Ok(()) => info!(chat_id, "sent reminder"),
            Err(err) => error!(chat_id, "failed to send reminder: {}", err),
        }
    });
}

#[cfg(test)]
mod test_reminder {
    use super::*;
    use crate::channels::memory::MemoryChannel;

    #[tokio::test(start_paused = true)]
    async fn it_should_fire_after_the_delay() {
        let channel = MemoryChannel::new();
        schedule_one_shot(
            Arc::new(channel.clone()),
            42,
            Duration::from_secs(24 * 60 * 60),
            "come back".to_owned(),
        );

        // Let the detached task be polled so it registers its sleep timer
        // before we advance the paused clock.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;
        // let the detached task run
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let sent = channel.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text(), Some("come back"));
    }

    #[tokio::test(start_paused = true)]
    async fn it_should_swallow_delivery_failures() {
        let channel = MemoryChannel::new();
        channel.mark_unreachable(42);
        schedule_one_shot(
            Arc::new(channel.clone()),
            42,
            Duration::from_secs(1),
            "come back".to_owned(),
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(channel.sent().is_empty());
    }
}

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

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::context::AppContext;
use crate::conversation::{self, InboundMessage};

/// One mailbox worker per chat id: updates for the same profile are handled
/// strictly in arrival order, while different profiles run in parallel. A
/// failing update is logged and isolated; the worker keeps draining.
pub struct Dispatcher {
    ctx: AppContext,
    workers: Mutex<HashMap<i64, mpsc::Sender<InboundMessage>>>,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(ctx: AppContext) -> Self {
        Dispatcher {
            ctx,
            workers: Mutex::new(HashMap::new()),
            tracker: TaskTracker::new(),
        }
    }

    pub async fn dispatch(&self, msg: InboundMessage) {
        let sender = self.worker_for(msg.chat_id);
        if sender.send(msg).await.is_err() {
            // the worker is gone only when the dispatcher is shutting down
            debug!("dropping update for a closed worker");
        }
    }

    fn worker_for(&self, chat_id: i64) -> mpsc::Sender<InboundMessage> {
        let mut workers = self.workers.lock().unwrap();
        if let Some(sender) = workers.get(&chat_id) {
            return sender.clone();
        }

        let (sender, mut receiver) = mpsc::channel::<InboundMessage>(100);
        let ctx = self.ctx.clone();
        self.tracker.spawn(async move {
            while let Some(msg) = receiver.recv().await {
                if let Err(err) = conversation::process_message(&ctx, &msg).await {
                    error!(chat_id = msg.chat_id, "update failed: {}", err);
                }
            }
        });
        workers.insert(chat_id, sender.clone());
        sender
    }

    /// Closes every mailbox and waits for the workers to drain.
    pub async fn shutdown(&self) {
        self.workers.lock().unwrap().clear();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

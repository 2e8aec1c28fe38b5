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

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::channels::Channel;
use crate::config::Settings;
use crate::conversation::ContextStore;
use crate::gateway::PaymentGateway;
use crate::messages::MessageCatalog;

/// Everything a handler needs, built once at startup and passed explicitly;
/// there is no process-wide singleton to reach for.
#[derive(Clone)]
pub struct AppContext {
    pub db: DatabaseConnection,
    pub channel: Arc<dyn Channel>,
    pub gateway: PaymentGateway,
    pub settings: Settings,
    pub messages: MessageCatalog,
    pub contexts: ContextStore,
}

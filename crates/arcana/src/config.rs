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
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use arcana_common::error::Result;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Path to the sqlite database file.
    pub database: String,
    /// Address the payment API binds to.
    pub bind: String,
    /// Directory holding one subdirectory of card images per card category.
    pub media_root: PathBuf,
    /// Optional TOML file overriding the built-in message catalog.
    pub messages_file: Option<PathBuf>,
    /// Delay before the one-shot re-engagement nudge.
    pub reminder_hours: u64,
    /// Where the closing consultation button points.
    pub consultant_url: String,
    /// Embedded plan-picker page.
    pub webapp_url: String,
    pub terms_url: String,
    pub privacy_url: String,
    pub gateway: GatewaySettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    pub merchant_url: Url,
    pub secret_key: String,
    /// Demo payments: the gateway expects the secret with a "demo" suffix
    /// and `do=test` requests.
    pub test_mode: bool,
    pub notification_url: String,
    pub success_url: String,
    pub return_url: Option<String>,
    /// `sys` field identifying this installation to the gateway.
    pub system_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database: "arcana.sqlite".to_owned(),
            bind: "127.0.0.1:8394".to_owned(),
            media_root: PathBuf::from("media"),
            messages_file: None,
            reminder_hours: 24,
            consultant_url: "https://t.me/arcana_guide".to_owned(),
            webapp_url: "https://arcana.throneless.tech/webapp/index.html".to_owned(),
            terms_url: "https://arcana.throneless.tech/terms.html".to_owned(),
            privacy_url: "https://arcana.throneless.tech/privacy.html".to_owned(),
            gateway: GatewaySettings::default(),
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            merchant_url: Url::parse("https://demo.payform.ru/").expect("static url"),
            secret_key: String::new(),
            test_mode: true,
            notification_url: "https://arcana.throneless.tech/payments/webhook".to_owned(),
            success_url: "https://arcana.throneless.tech/payments/success".to_owned(),
            return_url: None,
            system_label: "arcana".to_owned(),
        }
    }
}

impl Settings {
    /// Defaults, overlaid by the optional TOML file, overlaid by
    /// `ARCANA_`-prefixed environment variables (`__` nesting).
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = config {
            figment = figment.merge(Toml::file(path));
        }
        let settings = figment
            .merge(Env::prefixed("ARCANA_").split("__"))
            .extract()?;
        Ok(settings)
    }
}

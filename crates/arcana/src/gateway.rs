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

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use url::Url;

use crate::config::GatewaySettings;
use crate::db::entities::plan;
use arcana_common::error::{ArcanaError, Result};
use arcana_common::payment::SIGNATURE_FIELD;

type HmacSha256 = Hmac<Sha256>;

/// Signs outbound payment requests and verifies inbound webhook deliveries.
/// The signature scheme is HMAC-SHA256 over the compact JSON encoding of the
/// key-sorted parameter map, hex-encoded.
#[derive(Clone)]
pub struct PaymentGateway {
    merchant_url: Url,
    secret: String,
    test_mode: bool,
    notification_url: String,
    success_url: String,
    return_url: Option<String>,
    system_label: String,
}

impl PaymentGateway {
    pub fn new(settings: &GatewaySettings) -> Self {
        let secret = if settings.test_mode {
            info!("gateway: using demo secret key");
            format!("{}demo", settings.secret_key)
        } else {
            settings.secret_key.clone()
        };
        PaymentGateway {
            merchant_url: settings.merchant_url.clone(),
            secret,
            test_mode: settings.test_mode,
            notification_url: settings.notification_url.clone(),
            success_url: settings.success_url.clone(),
            return_url: settings.return_url.clone(),
            system_label: settings.system_label.clone(),
        }
    }

    /// `ORDER_<chat>_<plan>_<8 hex chars>`: diagnosable by eye, collision
    /// resistant through the random suffix.
    pub fn generate_order_id(&self, chat_id: i64, plan_code: &str) -> String {
        let suffix: String = uuid::Uuid::new_v4().simple().to_string()[..8].to_owned();
        let order_id = format!("ORDER_{}_{}_{}", chat_id, plan_code, suffix);
        info!(order_id, "generated order id");
        order_id
    }

    /// The canonical encoding is the compact JSON object of the key-sorted
    /// map, so two parameter sets with the same entries sign identically no
    /// matter the insertion order.
    pub fn sign(&self, params: &BTreeMap<String, String>) -> Result<String> {
        let canonical = serde_json::to_string(params)?;
        debug!(bytes = canonical.len(), "signing canonical parameter set");

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| ArcanaError::Gateway(format!("bad secret key: {}", e)))?;
        mac.update(canonical.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Recomputes the signature with the `signature` key excluded and
    /// compares in constant time. Never errors: an unsignable parameter set
    /// is simply not trusted.
    pub fn verify(&self, params: &BTreeMap<String, String>, supplied: &str) -> bool {
        let mut unsigned = params.clone();
        unsigned.remove(SIGNATURE_FIELD);

        let Ok(expected) = self.sign(&unsigned) else {
            return false;
        };
        expected.as_bytes().ct_eq(supplied.as_bytes()).into()
    }

    /// Builds the signed redirect URL the payer is sent to. Recurring plans
    /// reference the gateway's subscription id; one-shot plans fall back to
    /// line items.
    pub fn create_payment_link(
        &self,
        order_id: &str,
        plan: &plan::Model,
        chat_id: i64,
        username: Option<&str>,
    ) -> Result<String> {
        let mut params = BTreeMap::new();
        let operation = if self.test_mode { "test" } else { "link" };
        params.insert("do".to_owned(), operation.to_owned());
        params.insert("order_id".to_owned(), order_id.to_owned());
        // chat id rides along so the webhook can correlate the profile even
        // when the order row has been lost
        params.insert("customer_extra".to_owned(), chat_id.to_string());
        params.insert("urlNotification".to_owned(), self.notification_url.clone());
        params.insert("urlSuccess".to_owned(), self.success_url.clone());
        params.insert("sys".to_owned(), self.system_label.clone());

        match &plan.gateway_subscription_id {
            Some(subscription_id) => {
                params.insert("subscription".to_owned(), subscription_id.clone());
            }
            None => {
                params.insert("products[0][name]".to_owned(), plan.name.clone());
                params.insert("products[0][price]".to_owned(), plan.price.to_string());
                params.insert("products[0][quantity]".to_owned(), "1".to_owned());
            }
        }

        if let Some(return_url) = &self.return_url {
            params.insert("urlReturn".to_owned(), return_url.clone());
        }
        if let Some(username) = username {
            params.insert(
                "customer_comment".to_owned(),
                format!("Telegram: @{}", username),
            );
        }

        let signature = self.sign(&params)?;
        params.insert(SIGNATURE_FIELD.to_owned(), signature);

        let mut url = self.merchant_url.clone();
        url.query_pairs_mut().extend_pairs(params.iter());

        info!(
            order_id,
            plan = plan.code,
            test_mode = self.test_mode,
            "created payment link"
        );
        Ok(url.to_string())
    }
}

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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Form field carrying the HMAC signature in gateway requests and webhooks.
pub const SIGNATURE_FIELD: &str = "signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "success" => Some(PaymentStatus::Success),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields the gateway is contractually required (or allowed) to post to
/// the notification endpoint. The full form map is kept alongside because
/// the signature covers every delivered field, not just these.
#[derive(Debug, Clone)]
pub struct WebhookNotification {
    pub order_id: String,
    pub payment_status: String,
    pub signature: String,
    pub payment_id: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_extra: Option<String>,
}

impl WebhookNotification {
    /// Extracts the contractual fields from a decoded form body. Returns
    /// `None` when any of the required fields is missing or empty.
    pub fn from_form(form: &BTreeMap<String, String>) -> Option<Self> {
        let field = |key: &str| form.get(key).filter(|v| !v.is_empty()).cloned();

        Some(WebhookNotification {
            order_id: field("order_id")?,
            payment_status: field("payment_status")?.to_ascii_lowercase(),
            signature: field(SIGNATURE_FIELD)?,
            payment_id: field("payment_id"),
            subscription_id: field("subscription_id"),
            customer_extra: field("customer_extra"),
        })
    }
}

#[cfg(test)]
mod test_payment {
    use super::*;

    #[test]
    fn it_should_roundtrip_statuses() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Success,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("SUCCESS"), Some(PaymentStatus::Success));
        assert_eq!(PaymentStatus::parse("charged"), None);
    }

    #[test]
    fn it_should_reject_incomplete_notifications() {
        let mut form = BTreeMap::new();
        form.insert("order_id".to_owned(), "ORDER_1_monthly_abc".to_owned());
        form.insert("payment_status".to_owned(), "Success".to_owned());
        assert!(WebhookNotification::from_form(&form).is_none());

        form.insert(SIGNATURE_FIELD.to_owned(), "deadbeef".to_owned());
        let parsed = WebhookNotification::from_form(&form).unwrap();
        assert_eq!(parsed.payment_status, "success");
        assert_eq!(parsed.customer_extra, None);
    }
}

//! Temporary locks on phone numbers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which database a claimed number came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    Client,
    Customer,
    Special,
}

/// A lease tying a phone number to the identity calling it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberClaim {
    pub phone_number: String,
    pub claimed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_type: Option<ClaimType>,
    pub claimed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NumberClaim {
    /// A claim holds strictly before its expiry; at the expiry instant it is released
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

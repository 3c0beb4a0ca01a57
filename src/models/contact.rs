//! Contact records: prospective clients, existing customers, special numbers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Call status of a contact record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    New,
    Assigned,
    Contacted,
    Interested,
    NotInterested,
    Callback,
    Converted,
    Archived,
    #[serde(untagged)]
    Other(String),
}

impl ContactStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Assigned => "assigned",
            ContactStatus::Contacted => "contacted",
            ContactStatus::Interested => "interested",
            ContactStatus::NotInterested => "not_interested",
            ContactStatus::Callback => "callback",
            ContactStatus::Converted => "converted",
            ContactStatus::Archived => "archived",
            ContactStatus::Other(s) => s,
        }
    }

    /// Parse a free-form status, keeping unknown values verbatim
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "" | "new" => ContactStatus::New,
            "assigned" => ContactStatus::Assigned,
            "contacted" => ContactStatus::Contacted,
            "interested" => ContactStatus::Interested,
            "not_interested" => ContactStatus::NotInterested,
            "callback" => ContactStatus::Callback,
            "converted" => ContactStatus::Converted,
            "archived" => ContactStatus::Archived,
            _ => ContactStatus::Other(value.trim().to_string()),
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prospective client
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// An existing customer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// A number in the special database
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialNumber {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Which contact database a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Client,
    Customer,
}

/// A record moved to the archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedRecord {
    pub id: String,
    pub record_type: RecordType,
    pub archived_at: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
}

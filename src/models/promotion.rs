//! Promotions and coupon counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default)]
    pub target_count: u32,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Fields written when creating or editing a promotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PromotionInput {
    #[validate(length(min = 1, message = "promotion code is required"))]
    pub code: String,
    pub description: String,
    #[validate(range(min = 0.0, max = 100.0, message = "discount must be between 0 and 100"))]
    pub discount_percent: f64,
    pub usage_count: u32,
    pub target_count: u32,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

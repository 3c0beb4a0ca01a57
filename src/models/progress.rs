//! Per-agent call counters and live agent status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calls made by one agent on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub agent_id: String,
    pub date: String,
    #[serde(default)]
    pub calls_made: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

impl DailyProgress {
    pub fn empty(agent_id: &str, date: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            date: date.to_string(),
            calls_made: 0,
            target: None,
        }
    }
}

/// What an agent is doing right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub agent_id: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_call: Option<String>,
    #[serde(default)]
    pub calls_today: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

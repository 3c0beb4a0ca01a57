use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{DataService, Mode};
use crate::error::Result;
use crate::local::keys;
use crate::models::{AgentStatus, ApiResponse};

/// Data sets that can be wiped from the admin panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataTarget {
    Clients,
    Customers,
    SpecialDatabase,
    Archive,
    DailyProgress,
    CallScripts,
    Promotions,
    NumberClaims,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl DataService {
    /// Zero every agent's call counter on the backend, then the local copies
    pub async fn reset_all_counters(&self) -> ApiResponse<()> {
        self.remote_only("reset_all_counters", async {
            self.api.post("/reset-all-counters").execute_value().await?;
            if let Err(e) = self.clear_local_counters() {
                warn!("Counters reset remotely but local copies were kept: {}", e);
            }
            info!("All call counters reset");
            Ok(())
        })
        .await
    }

    /// Delete the chosen data sets; returns the number of rows removed per set
    pub async fn delete_selected_data(&self, targets: &[DataTarget]) -> ApiResponse<BTreeMap<String, u64>> {
        if targets.is_empty() {
            return ApiResponse::failed("Select at least one data set to delete");
        }
        self.remote_only("delete_selected_data", async {
            let deleted: Option<BTreeMap<String, u64>> = self
                .api
                .post("/admin/delete-selected-data")
                .json(&json!({ "targets": targets }))?
                .execute_field("deleted")
                .await?;
            Ok(deleted.unwrap_or_default())
        })
        .await
    }

    pub async fn health_check(&self) -> ApiResponse<HealthStatus> {
        self.remote_only("health_check", async {
            self.api.get("/health").long_running().execute().await
        })
        .await
    }

    /// Ask the backend to create its schema; may take as long as the health timeout
    pub async fn initialize_database(&self) -> ApiResponse<()> {
        self.remote_only("initialize_database", async {
            self.api.post("/setup/initialize").long_running().execute_value().await?;
            Ok(())
        })
        .await
    }

    /// Live agent activity; polled, so fallbacks are not logged
    pub async fn get_agent_statuses(&self) -> ApiResponse<Vec<AgentStatus>> {
        self.with_fallback(
            "get_agent_statuses",
            Mode::Silent,
            async { self.api.get("/agent-monitoring").execute_field("agents").await },
            || Ok(Vec::new()),
        )
        .await
    }

    fn clear_local_counters(&self) -> Result<()> {
        self.store.set(keys::CALLS_TODAY, &0u32)?;
        self.store.remove(keys::DAILY_PROGRESS)
    }
}

use std::collections::HashMap;

use log::warn;

use super::{segment, DataService, Mode};
use crate::clock::date_key;
use crate::error::Result;
use crate::local::keys;
use crate::models::{ApiResponse, DailyProgress};

type ProgressMap = HashMap<String, DailyProgress>;

impl DataService {
    pub async fn get_daily_progress(&self, agent_id: &str) -> ApiResponse<DailyProgress> {
        let path = format!("/daily-progress/{}", segment(agent_id));
        self.with_fallback(
            "get_daily_progress",
            Mode::Silent,
            async { self.api.get(&path).execute_field("progress").await },
            || Ok(self.local_progress(agent_id)),
        )
        .await
    }

    /// Count one call for the agent today
    pub async fn increment_daily_progress(&self, agent_id: &str) -> ApiResponse<DailyProgress> {
        let path = format!("/daily-progress/{}/increment", segment(agent_id));
        self.write_with_fallback(
            "increment_daily_progress",
            async {
                let progress: DailyProgress = self.api.post(&path).execute_field("progress").await?;
                self.remember_progress(&progress);
                Ok(progress)
            },
            || self.increment_locally(agent_id),
        )
        .await
    }

    /// Today's progress for every agent; polled by dashboards
    pub async fn get_all_daily_progress(&self) -> ApiResponse<Vec<DailyProgress>> {
        self.with_fallback(
            "get_all_daily_progress",
            Mode::Silent,
            async { self.api.get("/daily-progress").execute_field("progress").await },
            || {
                let today = self.today_key();
                let mut all: Vec<DailyProgress> = self
                    .store
                    .get(keys::DAILY_PROGRESS, ProgressMap::new())
                    .into_values()
                    .filter(|p| p.date == today)
                    .collect();
                all.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
                Ok(all)
            },
        )
        .await
    }

    fn today_key(&self) -> String {
        date_key(self.clock.today())
    }

    fn local_progress(&self, agent_id: &str) -> DailyProgress {
        let today = self.today_key();
        self.store
            .get(keys::DAILY_PROGRESS, ProgressMap::new())
            .remove(agent_id)
            .filter(|p| p.date == today)
            .unwrap_or_else(|| DailyProgress::empty(agent_id, &today))
    }

    fn increment_locally(&self, agent_id: &str) -> Result<DailyProgress> {
        let mut progress = self.local_progress(agent_id);
        progress.calls_made += 1;
        let written = progress.clone();
        self.store.update(keys::DAILY_PROGRESS, ProgressMap::new(), move |map| {
            map.insert(written.agent_id.clone(), written);
        })?;
        Ok(progress)
    }

    fn remember_progress(&self, progress: &DailyProgress) {
        let result = self.store.update(keys::DAILY_PROGRESS, ProgressMap::new(), |map| {
            map.insert(progress.agent_id.clone(), progress.clone());
        });
        if let Err(e) = result {
            warn!("Could not cache daily progress: {}", e);
        }
    }
}

use log::warn;
use serde_json::json;
use validator::Validate;

use super::{DataService, Mode};
use crate::error::Error;
use crate::local::keys;
use crate::models::{ApiResponse, EmailRecipient, SmtpSettings, ThreeCxSettings};

impl DataService {
    pub async fn get_smtp_settings(&self) -> ApiResponse<SmtpSettings> {
        self.with_fallback(
            "get_smtp_settings",
            Mode::Logged,
            async {
                let settings: Option<SmtpSettings> = self.api.get("/smtp-settings").execute_field("settings").await?;
                Ok(settings.unwrap_or_default())
            },
            || Ok(SmtpSettings::default()),
        )
        .await
    }

    pub async fn save_smtp_settings(&self, settings: &SmtpSettings) -> ApiResponse<SmtpSettings> {
        if let Err(e) = settings.validate() {
            return ApiResponse::failed(Error::from(e).to_string());
        }
        self.remote_only("save_smtp_settings", async {
            self.api
                .put("/smtp-settings")
                .json(&json!({ "settings": settings }))?
                .execute_field("settings")
                .await
        })
        .await
    }

    /// Report recipients; the last successful fetch is cached locally
    pub async fn get_email_recipients(&self) -> ApiResponse<Vec<EmailRecipient>> {
        self.with_fallback(
            "get_email_recipients",
            Mode::Logged,
            async {
                let recipients: Vec<EmailRecipient> =
                    self.api.get("/smtp-settings/recipients").execute_field("recipients").await?;
                if let Err(e) = self.store.set(keys::EMAIL_RECIPIENTS, &recipients) {
                    warn!("Could not cache email recipients: {}", e);
                }
                Ok(recipients)
            },
            || Ok(self.store.get(keys::EMAIL_RECIPIENTS, Vec::new())),
        )
        .await
    }

    pub async fn save_email_recipients(&self, recipients: &[EmailRecipient]) -> ApiResponse<Vec<EmailRecipient>> {
        for recipient in recipients {
            if let Err(e) = recipient.validate() {
                return ApiResponse::failed(Error::from(e).to_string());
            }
        }
        self.remote_only("save_email_recipients", async {
            let saved: Vec<EmailRecipient> = self
                .api
                .put("/smtp-settings/recipients")
                .json(&json!({ "recipients": recipients }))?
                .execute_field("recipients")
                .await?;
            if let Err(e) = self.store.set(keys::EMAIL_RECIPIENTS, &saved) {
                warn!("Could not cache email recipients: {}", e);
            }
            Ok(saved)
        })
        .await
    }

    pub async fn get_threecx_settings(&self) -> ApiResponse<ThreeCxSettings> {
        self.with_fallback(
            "get_threecx_settings",
            Mode::Logged,
            async {
                let settings: Option<ThreeCxSettings> =
                    self.api.get("/threecx-settings").execute_field("settings").await?;
                Ok(settings.unwrap_or_default())
            },
            || Ok(ThreeCxSettings::default()),
        )
        .await
    }

    pub async fn save_threecx_settings(&self, settings: &ThreeCxSettings) -> ApiResponse<ThreeCxSettings> {
        self.remote_only("save_threecx_settings", async {
            self.api
                .put("/threecx-settings")
                .json(&json!({ "settings": settings }))?
                .execute_field("settings")
                .await
        })
        .await
    }
}

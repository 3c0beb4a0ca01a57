use validator::Validate;

use super::{segment, DataService, Mode};
use crate::error::Error;
use crate::models::{ApiResponse, Promotion, PromotionInput};

impl DataService {
    pub async fn get_promotions(&self) -> ApiResponse<Vec<Promotion>> {
        self.with_fallback(
            "get_promotions",
            Mode::Logged,
            async { self.api.get("/promotions").execute_field("promotions").await },
            || Ok(Vec::new()),
        )
        .await
    }

    pub async fn create_promotion(&self, input: &PromotionInput) -> ApiResponse<Promotion> {
        if let Err(e) = input.validate() {
            return ApiResponse::failed(Error::from(e).to_string());
        }
        self.remote_only("create_promotion", async {
            self.api.post("/promotions").json(input)?.execute_field("promotion").await
        })
        .await
    }

    /// Overwrite a promotion, counters included
    pub async fn update_promotion(&self, id: &str, input: &PromotionInput) -> ApiResponse<Promotion> {
        if let Err(e) = input.validate() {
            return ApiResponse::failed(Error::from(e).to_string());
        }
        let path = format!("/promotions/{}", segment(id));
        self.remote_only("update_promotion", async {
            self.api.put(&path).json(input)?.execute_field("promotion").await
        })
        .await
    }

    pub async fn delete_promotion(&self, id: &str) -> ApiResponse<()> {
        let path = format!("/promotions/{}", segment(id));
        self.remote_only("delete_promotion", async {
            self.api.delete(&path).execute_value().await?;
            Ok(())
        })
        .await
    }
}

use super::{segment, DataService, Mode};
use crate::models::{ApiResponse, CallScript, CallScriptInput, ScriptType};

impl DataService {
    /// All scripts, or the built-in defaults when none can be loaded
    pub async fn get_call_scripts(&self) -> ApiResponse<Vec<CallScript>> {
        self.with_fallback(
            "get_call_scripts",
            Mode::Logged,
            async { self.api.get("/call-scripts").execute_field("scripts").await },
            || Ok(CallScript::builtins()),
        )
        .await
    }

    /// The active script for a type, falling back to the built-in one
    pub async fn get_active_script(&self, script_type: ScriptType) -> ApiResponse<CallScript> {
        let path = format!("/call-scripts/active/{script_type}");
        self.with_fallback(
            "get_active_script",
            Mode::Silent,
            async {
                let script: Option<CallScript> = self.api.get(&path).execute_field("script").await?;
                Ok(script.unwrap_or_else(|| CallScript::builtin(script_type)))
            },
            || Ok(CallScript::builtin(script_type)),
        )
        .await
    }

    pub async fn create_call_script(&self, input: &CallScriptInput) -> ApiResponse<CallScript> {
        self.remote_only("create_call_script", async {
            self.api.post("/call-scripts").json(input)?.execute_field("script").await
        })
        .await
    }

    pub async fn update_call_script(&self, id: &str, input: &CallScriptInput) -> ApiResponse<CallScript> {
        let path = format!("/call-scripts/{}", segment(id));
        self.remote_only("update_call_script", async {
            self.api.put(&path).json(input)?.execute_field("script").await
        })
        .await
    }

    pub async fn delete_call_script(&self, id: &str) -> ApiResponse<()> {
        let path = format!("/call-scripts/{}", segment(id));
        self.remote_only("delete_call_script", async {
            self.api.delete(&path).execute_value().await?;
            Ok(())
        })
        .await
    }

    /// Flag a script active; the backend clears the flag on others of the same type
    pub async fn activate_call_script(&self, id: &str) -> ApiResponse<CallScript> {
        let path = format!("/call-scripts/{}/activate", segment(id));
        self.remote_only("activate_call_script", async {
            self.api.post(&path).execute_field("script").await
        })
        .await
    }
}

//! Call scripts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which audience a script is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    Prospective,
    Existing,
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScriptType::Prospective => "prospective",
            ScriptType::Existing => "existing",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallScript {
    pub id: String,
    pub name: String,
    pub script_type: ScriptType,
    pub content: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Fields sent when creating or editing a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallScriptInput {
    pub name: String,
    pub script_type: ScriptType,
    pub content: String,
    #[serde(default)]
    pub is_active: bool,
}

impl CallScript {
    /// Built-in script used when nothing can be loaded
    pub fn builtin(script_type: ScriptType) -> Self {
        match script_type {
            ScriptType::Prospective => Self {
                id: "default-prospective".to_string(),
                name: "Default prospective script".to_string(),
                script_type,
                content: "Hello, my name is {agentName} and I'm calling from {companyName}. \
                          Do you have a moment to hear about how we can help your business?"
                    .to_string(),
                is_active: true,
            },
            ScriptType::Existing => Self {
                id: "default-existing".to_string(),
                name: "Default customer script".to_string(),
                script_type,
                content: "Hello {customerName}, this is {agentName} from {companyName}. \
                          I'm calling to check in on your account and let you know about our current offers."
                    .to_string(),
                is_active: true,
            },
        }
    }

    pub fn builtins() -> Vec<Self> {
        vec![Self::builtin(ScriptType::Prospective), Self::builtin(ScriptType::Existing)]
    }
}

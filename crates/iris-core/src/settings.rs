use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// List-valued settings read from the JSON settings file.
///
/// Every field is optional; unset fields fall back to the environment or the
/// built-in default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub channel_whitelist: Option<Vec<String>>,
    pub channel_blacklist: Option<Vec<String>>,
    /// Empty string disables the channel pattern.
    pub channel_regex: Option<String>,
    pub role_whitelist: Option<Vec<String>>,
    pub role_blacklist: Option<Vec<String>>,
    pub superuser_roles: Option<Vec<String>>,
    pub allow_private: Option<bool>,
    pub opt_role_prefix: Option<String>,
    pub auto_role_prefix: Option<String>,
}

impl Settings {
    /// Load settings from `path`. A missing file yields empty settings.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&raw)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! System settings and configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// What a sort does when the links form a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CyclePolicy {
    /// Report [`GraphError::CyclicDependency`](crate::GraphError::CyclicDependency)
    #[default]
    Fail,
    /// Order what can be ordered, then append the rest in insertion order
    InsertionOrder,
}

impl CyclePolicy {
    /// Get display name for this policy
    pub fn display_name(&self) -> &'static str {
        match self {
            CyclePolicy::Fail => "Fail",
            CyclePolicy::InsertionOrder => "Insertion order",
        }
    }
}

/// Settings of the update system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// Format version
    pub version: u32,
    /// Cycle handling during the update sort
    pub cycle_policy: CyclePolicy,
    /// Log every component update at debug level
    pub trace_updates: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            cycle_policy: CyclePolicy::default(),
            trace_updates: false,
        }
    }
}

impl SystemSettings {
    /// Load settings from a RON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: SystemSettings = ron::from_str(&content).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("failed to parse settings: {e}"),
            )
        })?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Settings version {} is newer than supported version {}",
                    settings.version, SETTINGS_FORMAT_VERSION
                ),
            ));
        }

        Ok(settings)
    }

    /// Save settings to a RON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        let content = ron::ser::to_string_pretty(self, config).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("failed to serialize settings: {e}"),
            )
        })?;

        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SystemSettings::default();
        assert_eq!(settings.version, SETTINGS_FORMAT_VERSION);
        assert_eq!(settings.cycle_policy, CyclePolicy::Fail);
        assert!(!settings.trace_updates);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings: SystemSettings = ron::from_str("(cycle_policy: InsertionOrder)").unwrap();
        assert_eq!(settings.cycle_policy, CyclePolicy::InsertionOrder);
        assert_eq!(settings.version, SETTINGS_FORMAT_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("propflow-settings-{}.ron", uuid::Uuid::new_v4()));
        let settings = SystemSettings {
            trace_updates: true,
            ..SystemSettings::default()
        };

        settings.save(&path).unwrap();
        let loaded = SystemSettings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let path = std::env::temp_dir().join(format!("propflow-settings-{}.ron", uuid::Uuid::new_v4()));
        std::fs::write(&path, "(version: 99)").unwrap();
        let result = SystemSettings::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }
}

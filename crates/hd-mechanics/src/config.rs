//! Configuration for the heroic dice engine.

use serde::{Deserialize, Serialize};

/// Settings loaded once per invocation by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Faces on each heroic die.
    pub hero_die_faces: u32,
    /// Actor resource that holds the heroic dice balance.
    pub resource_key: String,
    /// Heroic dice can only ever raise healing rolls.
    pub healing_house_rule: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hero_die_faces: 6,
            resource_key: "heroDice".to_string(),
            healing_house_rule: false,
        }
    }
}

impl EngineConfig {
    /// Set the heroic die size (at least 1).
    pub fn with_hero_die_faces(mut self, faces: u32) -> Self {
        self.hero_die_faces = faces.max(1);
        self
    }

    /// Set the actor resource key.
    pub fn with_resource_key(mut self, key: impl Into<String>) -> Self {
        self.resource_key = key.into();
        self
    }

    /// Enable or disable the healing house rule.
    pub fn with_healing_house_rule(mut self, enabled: bool) -> Self {
        self.healing_house_rule = enabled;
        self
    }
}

//! The actor-side resource pool heroic dice are spent from.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{MechError, MechResult};

/// A handle onto the host's actor that owns heroic dice.
#[async_trait]
pub trait ActorResourceHandle: Send {
    /// Current balance of the resource named `key`.
    fn hero_dice(&self, key: &str) -> u32;

    /// Spend `amount` from the resource named `key`.
    async fn deduct_hero_dice(&mut self, key: &str, amount: u32) -> MechResult<()>;
}

/// An actor whose resources live in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryActor {
    /// Display name.
    pub name: String,
    resources: HashMap<String, u32>,
}

impl InMemoryActor {
    /// Create an actor with no resources.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: HashMap::new(),
        }
    }

    /// Set the balance of a resource.
    pub fn with_resource(mut self, key: impl Into<String>, amount: u32) -> Self {
        self.resources.insert(key.into(), amount);
        self
    }
}

#[async_trait]
impl ActorResourceHandle for InMemoryActor {
    fn hero_dice(&self, key: &str) -> u32 {
        self.resources.get(key).copied().unwrap_or(0)
    }

    async fn deduct_hero_dice(&mut self, key: &str, amount: u32) -> MechResult<()> {
        let balance = self.resources.entry(key.to_string()).or_insert(0);
        if *balance < amount {
            return Err(MechError::Resource(format!(
                "{} has {} {key}, cannot spend {amount}",
                self.name, balance
            )));
        }
        *balance -= amount;
        Ok(())
    }
}

//! Session and link configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Session configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Starting value of the incoming byte accumulator
    pub incoming_bytes: i64,
    /// Starting value of the incoming delivery accumulator
    pub incoming_deliveries: i64,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incoming_bytes(mut self, bytes: i64) -> Self {
        self.incoming_bytes = bytes;
        self
    }

    pub fn incoming_deliveries(mut self, deliveries: i64) -> Self {
        self.incoming_deliveries = deliveries;
        self
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Receiving link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Link name
    pub name: String,
    /// Credit granted when the link is attached (0 = none)
    pub initial_credit: u32,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            name: "receiver".to_string(),
            initial_credit: 0,
        }
    }
}

impl ReceiverConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn initial_credit(mut self, credit: u32) -> Self {
        self.initial_credit = credit;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::Config("link name must not be empty".into()));
        }
        Ok(())
    }
}

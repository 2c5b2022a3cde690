use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScheduleError};

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// allowed distance of installment percentages from 100
    pub percentage_tolerance: Decimal,
    /// compare-and-set retries when a milestone changes during a payment
    pub max_update_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            percentage_tolerance: dec!(0.01),
            max_update_retries: 3,
        }
    }
}

impl EngineConfig {
    /// parse from json, missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| ScheduleError::configuration(format!("invalid engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.percentage_tolerance.is_sign_negative() {
            return Err(ScheduleError::configuration(format!(
                "percentage_tolerance must not be negative, got {}",
                self.percentage_tolerance
            )));
        }
        Ok(())
    }

    pub fn with_percentage_tolerance(mut self, tolerance: Decimal) -> Self {
        self.percentage_tolerance = tolerance;
        self
    }

    pub fn with_max_update_retries(mut self, retries: u32) -> Self {
        self.max_update_retries = retries;
        self
    }
}

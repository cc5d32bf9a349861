//! Strategic driver table: the percentage adjustment the projection service is
//! asked to apply to each category, with its justification.
//!
//! Drivers are configuration data. They appear in the prompt and in the
//! "Assumptions" sheet of the exported report; nothing is computed from them
//! locally.

use crate::error::ConfigError;
use crate::inputs::Category;
use serde::{Deserialize, Serialize};

/// A single category adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub category: Category,
    /// Adjustment in percent, e.g. `4.2` for +4.2%.
    pub adjustment_percent: f64,
    pub justification: String,
}

impl Driver {
    pub fn new(category: Category, adjustment_percent: f64, justification: &str) -> Self {
        Self {
            category,
            adjustment_percent,
            justification: justification.to_string(),
        }
    }

    /// Adjustment as a ratio (`0.042` for +4.2%).
    pub fn adjustment_ratio(&self) -> f64 {
        self.adjustment_percent / 100.0
    }

    /// Signed percentage with one decimal, e.g. `+4.2%`.
    pub fn signed_percent(&self) -> String {
        format!("{:+.1}%", self.adjustment_percent)
    }

    /// The directive line embedded in prompts: `- Labor: +4.2% (CPI-adjusted wages)`.
    pub fn directive(&self) -> String {
        format!(
            "- {}: {} ({})",
            self.category,
            self.signed_percent(),
            self.justification
        )
    }
}

/// Ordered set of drivers, one per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverTable {
    drivers: Vec<Driver>,
}

impl Default for DriverTable {
    fn default() -> Self {
        Self {
            drivers: vec![
                Driver::new(Category::Contractors, 1.5, "Operational efficiency"),
                Driver::new(Category::Labor, 4.2, "CPI-adjusted wages"),
                Driver::new(Category::Fuel, 5.0, "Production increase"),
                Driver::new(Category::Power, 6.0, "Electricity tariffs"),
                Driver::new(Category::Maintenance, 3.0, "Preventive maintenance"),
            ],
        }
    }
}

impl DriverTable {
    /// Build a table, requiring exactly one driver per category.
    pub fn new(drivers: Vec<Driver>) -> Result<Self, ConfigError> {
        let table = Self { drivers };
        table.check()?;
        Ok(table)
    }

    /// Verify every category has exactly one driver and all adjustments are finite.
    pub fn check(&self) -> Result<(), ConfigError> {
        for category in Category::ALL {
            let count = self
                .drivers
                .iter()
                .filter(|d| d.category == category)
                .count();
            if count != 1 {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "driver table must list {} exactly once (found {})",
                        category, count
                    ),
                });
            }
        }
        if let Some(bad) = self
            .drivers
            .iter()
            .find(|d| !d.adjustment_percent.is_finite())
        {
            return Err(ConfigError::Invalid {
                message: format!("driver adjustment for {} is not finite", bad.category),
            });
        }
        Ok(())
    }

    /// Drivers in canonical category order.
    pub fn iter(&self) -> impl Iterator<Item = &Driver> {
        Category::ALL
            .into_iter()
            .filter_map(|c| self.get(c))
    }

    pub fn get(&self, category: Category) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.category == category)
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// All directive lines, canonical order, newline separated.
    pub fn directives(&self) -> String {
        self.iter()
            .map(Driver::directive)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

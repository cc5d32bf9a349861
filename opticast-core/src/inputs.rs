//! Expense categories and the operator-supplied input set.

use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// One of the five expense categories, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Contractors,
    Labor,
    Fuel,
    Power,
    Maintenance,
}

impl Category {
    /// All categories in canonical order.
    pub const ALL: [Category; 5] = [
        Category::Contractors,
        Category::Labor,
        Category::Fuel,
        Category::Power,
        Category::Maintenance,
    ];

    /// Display label, also used as the key on the wire.
    pub fn label(self) -> &'static str {
        match self {
            Category::Contractors => "Contractors",
            Category::Labor => "Labor",
            Category::Fuel => "Fuel",
            Category::Power => "Power",
            Category::Maintenance => "Maintenance",
        }
    }

    /// Position in canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Match a label leniently (surrounding whitespace and case are ignored).
    pub fn from_label(label: &str) -> Option<Category> {
        let wanted = label.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Five non-negative monetary amounts, one per [`Category`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSet {
    amounts: [f64; 5],
}

impl InputSet {
    /// Build an input set, rejecting negative or non-finite amounts.
    pub fn new(
        contractors: f64,
        labor: f64,
        fuel: f64,
        power: f64,
        maintenance: f64,
    ) -> Result<Self, InputError> {
        Self::from_amounts([contractors, labor, fuel, power, maintenance])
    }

    /// Build from amounts given in canonical category order.
    pub fn from_amounts(amounts: [f64; 5]) -> Result<Self, InputError> {
        for (category, value) in Category::ALL.iter().zip(amounts) {
            validate_amount(*category, value)?;
        }
        Ok(Self { amounts })
    }

    /// Amount entered for `category`.
    pub fn get(&self, category: Category) -> f64 {
        self.amounts[category.index()]
    }

    /// Replace the amount for one category.
    pub fn set(&mut self, category: Category, value: f64) -> Result<(), InputError> {
        validate_amount(category, value)?;
        self.amounts[category.index()] = value;
        Ok(())
    }

    /// `(category, amount)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    /// Sum of all entered amounts.
    pub fn total(&self) -> f64 {
        self.amounts.iter().sum()
    }
}

fn validate_amount(category: Category, value: f64) -> Result<(), InputError> {
    if !value.is_finite() {
        return Err(InputError::NotFinite {
            category: category.label().to_string(),
        });
    }
    if value < 0.0 {
        return Err(InputError::Negative {
            category: category.label().to_string(),
            value,
        });
    }
    Ok(())
}

/// Format an amount the way it is embedded in prompts: whole amounts carry no
/// decimal part, fractional ones use their shortest exact representation.
pub fn plain_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

//! Input collection: amounts from flags, or interactive prompts seeded with
//! the configured defaults.

use dialoguer::Input;
use opticast_core::config::InputDefaults;
use opticast_core::inputs::{Category, InputSet, plain_amount};

use crate::RunArgs;

/// Parse an amount typed by the operator. Accepts `250000`, `250,000`,
/// `$250,000.50` and surrounding whitespace; rejects negative values.
pub fn parse_amount(text: &str) -> Result<f64, String> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    let value: f64 = cleaned
        .parse()
        .map_err(|_| format!("'{}' is not a number", text.trim()))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a finite number", text.trim()));
    }
    if value < 0.0 {
        return Err("amounts must not be negative".to_string());
    }
    Ok(value)
}

fn flag_value(args: &RunArgs, category: Category) -> Option<f64> {
    match category {
        Category::Contractors => args.contractors,
        Category::Labor => args.labor,
        Category::Fuel => args.fuel,
        Category::Power => args.power,
        Category::Maintenance => args.maintenance,
    }
}

/// Amounts from flags, falling back to the defaults for anything not given.
pub fn from_flags(args: &RunArgs, defaults: &InputSet) -> anyhow::Result<InputSet> {
    let mut inputs = *defaults;
    for category in Category::ALL {
        if let Some(value) = flag_value(args, category) {
            inputs.set(category, value)?;
        }
    }
    Ok(inputs)
}

/// Prompt for each amount, offering the flag value or the default.
pub fn prompt_inputs(
    args: &RunArgs,
    defaults: &InputSet,
    settings: &InputDefaults,
    prior_label: &str,
) -> anyhow::Result<InputSet> {
    let seeded = from_flags(args, defaults)?;
    let mut inputs = seeded;
    println!(
        "Enter the {} amounts. Press Enter to keep the suggested value (step {}).",
        prior_label,
        plain_amount(settings.step)
    );
    for (category, suggested) in seeded.iter() {
        let answer: String = Input::new()
            .with_prompt(format!("{category} ($)"))
            .default(plain_amount(suggested))
            .validate_with(|text: &String| parse_amount(text).map(|_| ()))
            .interact_text()?;
        inputs.set(category, parse_amount(&answer).map_err(anyhow::Error::msg)?)?;
    }
    Ok(inputs)
}

//! Prompt construction for the projection service.
//!
//! The prompt is a pure function of the inputs, the driver table and the
//! period labels. It embeds the entered amounts as a labeled JSON object,
//! the driver directives and a zero-valued example of the reply schema.

use crate::config::PeriodLabels;
use crate::drivers::DriverTable;
use crate::inputs::{Category, InputSet, plain_amount};

/// Build the instruction prompt for one projection request.
pub fn build_prompt(inputs: &InputSet, drivers: &DriverTable, periods: &PeriodLabels) -> String {
    format!(
        "You are a senior financial analyst for an open-pit mining operation.\n\
         Project the {projected} operating expenses from the {prior} actual \
         expenses below.\n\
         \n\
         {prior} actual expenses (USD):\n\
         {values}\n\
         \n\
         Apply these strategic drivers to each category:\n\
         {directives}\n\
         \n\
         Respond ONLY with a JSON object that follows exactly this structure \
         (the zeros are placeholders):\n\
         {schema}\n\
         \n\
         Rules:\n\
         - Include one record per category, using the category names exactly as given.\n\
         - \"amount_prior\" is the {prior} amount and \"amount_projected\" the {projected} amount.\n\
         - \"variation_percent\" is ((total_projected / total_prior) - 1) * 100.\n\
         - \"analysis\" is a short executive narrative explaining the projection.\n\
         - Do not add any text outside the JSON object.",
        prior = periods.prior,
        projected = periods.projected,
        values = labeled_values(inputs),
        directives = drivers.directives(),
        schema = schema_example(),
    )
}

/// The entered amounts as a JSON object in canonical order, one key per line.
fn labeled_values(inputs: &InputSet) -> String {
    let lines: Vec<String> = inputs
        .iter()
        .map(|(category, amount)| format!("  \"{}\": {}", category, plain_amount(amount)))
        .collect();
    format!("{{\n{}\n}}", lines.join(",\n"))
}

fn schema_example() -> String {
    let records: Vec<String> = Category::ALL
        .iter()
        .map(|c| {
            format!(
                "    {{\"category\": \"{}\", \"amount_prior\": 0, \"amount_projected\": 0}}",
                c
            )
        })
        .collect();
    format!(
        "{{\n  \"analysis\": \"\",\n  \"records\": [\n{}\n  ],\n  \
         \"kpis\": {{\"total_prior\": 0, \"total_projected\": 0, \"variation_percent\": 0}}\n}}",
        records.join(",\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_inputs() -> InputSet {
        InputSet::new(250_000.0, 180_000.0, 85_000.0, 120_000.0, 60_000.0).unwrap()
    }

    #[test]
    fn test_prompt_embeds_labeled_values() {
        let prompt = build_prompt(
            &sample_inputs(),
            &DriverTable::default(),
            &PeriodLabels::default(),
        );
        assert!(prompt.contains("\"Contractors\": 250000,"));
        assert!(prompt.contains("\"Maintenance\": 60000\n}"));
        assert!(prompt.contains("2025 actual expenses (USD):"));
        assert!(prompt.contains("Project the 2026 operating expenses"));
    }

    #[test]
    fn test_prompt_embeds_all_directives() {
        let drivers = DriverTable::default();
        let prompt = build_prompt(&sample_inputs(), &drivers, &PeriodLabels::default());
        for driver in drivers.iter() {
            assert!(prompt.contains(&driver.directive()), "{}", driver.directive());
        }
    }

    #[test]
    fn test_prompt_has_schema_example() {
        let prompt = build_prompt(
            &sample_inputs(),
            &DriverTable::default(),
            &PeriodLabels::default(),
        );
        assert!(prompt.contains("\"records\": ["));
        assert!(prompt.contains("\"variation_percent\": 0}"));
        assert!(
            prompt.contains(
                "{\"category\": \"Fuel\", \"amount_prior\": 0, \"amount_projected\": 0}"
            )
        );
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_prompt(&sample_inputs(), &DriverTable::default(), &PeriodLabels::default());
        let b = build_prompt(&sample_inputs(), &DriverTable::default(), &PeriodLabels::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_fractional_amount_kept_exact() {
        let inputs = InputSet::new(1234.5, 0.0, 0.0, 0.0, 0.0).unwrap();
        let prompt = build_prompt(&inputs, &DriverTable::default(), &PeriodLabels::default());
        assert!(prompt.contains("\"Contractors\": 1234.5,"));
        assert!(prompt.contains("\"Labor\": 0,"));
    }
}

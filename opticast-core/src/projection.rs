//! Projection result types and validation of the service reply.
//!
//! The reply is deserialized strictly: every key is required and every
//! number must be finite. Records are matched to categories leniently
//! (trimmed, case-insensitive) and stored in canonical order. The KPI block
//! is checked against the records but never corrected; mismatches surface as
//! consistency warnings.

use serde::Deserialize;

use crate::error::ProjectionError;
use crate::inputs::Category;

/// Absolute tolerance for totals, in currency units.
const TOTAL_TOLERANCE: f64 = 0.5;
/// Absolute tolerance for the variation, in percentage points.
const VARIATION_TOLERANCE: f64 = 0.05;
/// Largest magnitude accepted for any reported number.
const MAX_MAGNITUDE: f64 = 1e15;

/// Prior and projected amounts for one category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryRecord {
    pub category: Category,
    pub amount_prior: f64,
    pub amount_projected: f64,
}

impl CategoryRecord {
    /// `projected - prior`.
    pub fn absolute_variation(&self) -> f64 {
        self.amount_projected - self.amount_prior
    }

    /// `projected / prior - 1`, or `0` when the prior amount is zero.
    pub fn relative_variation(&self) -> f64 {
        if self.amount_prior == 0.0 {
            0.0
        } else {
            self.amount_projected / self.amount_prior - 1.0
        }
    }

    /// `projected / prior`, or `None` when the prior amount is zero.
    pub fn applied_factor(&self) -> Option<f64> {
        (self.amount_prior != 0.0).then(|| self.amount_projected / self.amount_prior)
    }
}

/// The three headline aggregates as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct KpiSummary {
    pub total_prior: f64,
    pub total_projected: f64,
    /// Percentage, e.g. `5.65` for +5.65%.
    pub variation_percent: f64,
}

/// A validated projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    analysis: String,
    records: Vec<CategoryRecord>,
    kpis: KpiSummary,
}

#[derive(Deserialize)]
struct WireResult {
    analysis: String,
    records: Vec<WireRecord>,
    kpis: KpiSummary,
}

#[derive(Deserialize)]
struct WireRecord {
    category: String,
    amount_prior: f64,
    amount_projected: f64,
}

impl ProjectionResult {
    /// Parse and validate the reply text of the projection service.
    pub fn parse(text: &str) -> Result<Self, ProjectionError> {
        let body = strip_code_fence(text);
        let wire: WireResult = serde_json::from_str(body)
            .map_err(|e| ProjectionError::malformed(e.to_string(), text))?;

        let kpis = wire.kpis;
        for (name, value) in [
            ("kpis.total_prior", kpis.total_prior),
            ("kpis.total_projected", kpis.total_projected),
            ("kpis.variation_percent", kpis.variation_percent),
        ] {
            check_number(name, value, text)?;
        }

        let mut slots: [Option<CategoryRecord>; 5] = [None; 5];
        for record in wire.records {
            let category = Category::from_label(&record.category).ok_or_else(|| {
                ProjectionError::malformed(
                    format!("unknown category '{}'", record.category),
                    text,
                )
            })?;
            check_number(&format!("{category} amount_prior"), record.amount_prior, text)?;
            check_number(
                &format!("{category} amount_projected"),
                record.amount_projected,
                text,
            )?;
            let slot = &mut slots[category.index()];
            if slot.is_some() {
                return Err(ProjectionError::malformed(
                    format!("category {category} appears more than once"),
                    text,
                ));
            }
            *slot = Some(CategoryRecord {
                category,
                amount_prior: record.amount_prior,
                amount_projected: record.amount_projected,
            });
        }

        let mut records = Vec::with_capacity(Category::ALL.len());
        for (category, slot) in Category::ALL.iter().zip(slots) {
            match slot {
                Some(record) => records.push(record),
                None => {
                    return Err(ProjectionError::malformed(
                        format!("no record for category {category}"),
                        text,
                    ));
                }
            }
        }

        let result = Self {
            analysis: wire.analysis,
            records,
            kpis,
        };
        for warning in result.consistency_warnings() {
            tracing::warn!(%warning, "Projection KPIs disagree with records");
        }
        Ok(result)
    }

    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    /// Records in canonical category order.
    pub fn records(&self) -> &[CategoryRecord] {
        &self.records
    }

    pub fn record(&self, category: Category) -> Option<&CategoryRecord> {
        self.records.iter().find(|r| r.category == category)
    }

    pub fn kpis(&self) -> &KpiSummary {
        &self.kpis
    }

    /// Disagreements between the reported KPIs and the records.
    pub fn consistency_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let sum_prior: f64 = self.records.iter().map(|r| r.amount_prior).sum();
        let sum_projected: f64 = self.records.iter().map(|r| r.amount_projected).sum();

        if (self.kpis.total_prior - sum_prior).abs() > TOTAL_TOLERANCE {
            warnings.push(format!(
                "total_prior {} differs from the sum of records {}",
                self.kpis.total_prior, sum_prior
            ));
        }
        if (self.kpis.total_projected - sum_projected).abs() > TOTAL_TOLERANCE {
            warnings.push(format!(
                "total_projected {} differs from the sum of records {}",
                self.kpis.total_projected, sum_projected
            ));
        }
        if self.kpis.total_prior != 0.0 {
            let expected = (self.kpis.total_projected / self.kpis.total_prior - 1.0) * 100.0;
            if (self.kpis.variation_percent - expected).abs() > VARIATION_TOLERANCE {
                warnings.push(format!(
                    "variation_percent {} differs from the totals ({:.2})",
                    self.kpis.variation_percent, expected
                ));
            }
        }
        warnings
    }
}

fn check_number(name: &str, value: f64, text: &str) -> Result<(), ProjectionError> {
    if !value.is_finite() {
        return Err(ProjectionError::malformed(
            format!("{name} is not a finite number"),
            text,
        ));
    }
    if value.abs() > MAX_MAGNITUDE {
        return Err(ProjectionError::malformed(
            format!("{name} ({value:e}) is outside the supported range"),
            text,
        ));
    }
    Ok(())
}

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````), if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "analysis": "Costs rise mainly due to power tariffs.",
        "records": [
            {"category": "Contractors", "amount_prior": 250000, "amount_projected": 253750},
            {"category": "Labor", "amount_prior": 180000, "amount_projected": 187560},
            {"category": "Fuel", "amount_prior": 85000, "amount_projected": 89250},
            {"category": "Power", "amount_prior": 120000, "amount_projected": 127200},
            {"category": "Maintenance", "amount_prior": 60000, "amount_projected": 61800}
        ],
        "kpis": {"total_prior": 695000, "total_projected": 719560, "variation_percent": 3.53}
    }"#;

    fn assert_malformed(text: &str, needle: &str) {
        let err = ProjectionResult::parse(text).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Parse);
        match err {
            ProjectionError::MalformedResponse { reason, .. } => {
                assert!(reason.contains(needle), "reason {reason:?} lacks {needle:?}")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_valid_reply() {
        let result = ProjectionResult::parse(SAMPLE).unwrap();
        assert_eq!(result.records().len(), 5);
        assert_eq!(result.kpis().total_prior, 695_000.0);
        assert_eq!(
            result.record(Category::Power).unwrap().amount_projected,
            127_200.0
        );
        assert!(result.analysis().starts_with("Costs rise"));
        assert!(result.consistency_warnings().is_empty());
    }

    #[test]
    fn test_records_reordered_and_matched_leniently() {
        let text = r#"{"analysis": "", "records": [
            {"category": " maintenance ", "amount_prior": 5, "amount_projected": 5},
            {"category": "FUEL", "amount_prior": 3, "amount_projected": 3},
            {"category": "Power", "amount_prior": 4, "amount_projected": 4},
            {"category": "labor", "amount_prior": 2, "amount_projected": 2},
            {"category": "Contractors", "amount_prior": 1, "amount_projected": 1}
        ], "kpis": {"total_prior": 15, "total_projected": 15, "variation_percent": 0}}"#;
        let result = ProjectionResult::parse(text).unwrap();
        let order: Vec<_> = result.records().iter().map(|r| r.category).collect();
        assert_eq!(order, Category::ALL.to_vec());
        assert_eq!(result.records()[0].amount_prior, 1.0);
    }

    #[test]
    fn test_code_fence_stripped() {
        let fenced = format!("```json\n{SAMPLE}\n```");
        assert!(ProjectionResult::parse(&fenced).is_ok());
    }

    #[test]
    fn test_missing_kpis_rejected() {
        assert_malformed(
            r#"{"analysis": "x", "records": []}"#,
            "missing field `kpis`",
        );
    }

    #[test]
    fn test_wrong_type_rejected() {
        let text = SAMPLE.replace("\"total_prior\": 695000", "\"total_prior\": \"695000\"");
        assert!(ProjectionResult::parse(&text).is_err());
    }

    #[test]
    fn test_not_json_rejected() {
        assert_malformed("Sorry, I cannot help with that.", "expected");
    }

    #[test]
    fn test_missing_category_rejected() {
        let text = SAMPLE.replace(
            r#"{"category": "Fuel", "amount_prior": 85000, "amount_projected": 89250},"#,
            "",
        );
        assert_malformed(&text, "no record for category Fuel");
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let text = SAMPLE.replace("\"Fuel\"", "\"Labor\"");
        assert_malformed(&text, "more than once");
    }

    #[test]
    fn test_unknown_category_rejected() {
        let text = SAMPLE.replace("\"Fuel\"", "\"Explosives\"");
        assert_malformed(&text, "unknown category 'Explosives'");
    }

    #[test]
    fn test_inconsistent_kpis_warn_only() {
        let text = SAMPLE
            .replace("\"total_projected\": 719560", "\"total_projected\": 734285")
            .replace("\"variation_percent\": 3.53", "\"variation_percent\": 9.0");
        let result = ProjectionResult::parse(&text).unwrap();
        let warnings = result.consistency_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("total_projected"));
        assert!(warnings[1].contains("variation_percent"));
        // Reported values are kept verbatim.
        assert_eq!(result.kpis().total_projected, 734_285.0);
    }

    #[test]
    fn test_absurd_magnitudes_rejected() {
        let text = SAMPLE.replace("\"amount_projected\": 89250", "\"amount_projected\": 1e300");
        assert_malformed(&text, "Fuel amount_projected");

        let text = SAMPLE.replace("\"total_prior\": 695000", "\"total_prior\": -4e38");
        assert_malformed(&text, "outside the supported range");

        let text = SAMPLE.replace("\"amount_prior\": 60000", "\"amount_prior\": 1e15");
        assert!(ProjectionResult::parse(&text).is_ok());
    }

    #[test]
    fn test_relative_variation() {
        let record = CategoryRecord {
            category: Category::Fuel,
            amount_prior: 100_000.0,
            amount_projected: 105_000.0,
        };
        assert!((record.relative_variation() - 0.05).abs() < 1e-12);
        assert_eq!(record.absolute_variation(), 5_000.0);

        let from_zero = CategoryRecord {
            category: Category::Fuel,
            amount_prior: 0.0,
            amount_projected: 50_000.0,
        };
        assert_eq!(from_zero.relative_variation(), 0.0);
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("  {}  "), "{}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}```"), "{\"a\":1}");
    }
}

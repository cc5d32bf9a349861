//! The variance bridge: how the prior total walks to the projected total,
//! one category at a time.
//!
//! The bridge opens with the prior total, applies each category's change
//! from largest increase to largest decrease, and closes with the projected
//! total. Both totals are the record sums, so the walk always closes.

use crate::config::PeriodLabels;
use crate::projection::ProjectionResult;

/// What a bridge step represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Total,
    Increase,
    Decrease,
}

impl StepKind {
    pub fn label(self) -> &'static str {
        match self {
            StepKind::Total => "Total",
            StepKind::Increase => "Increase",
            StepKind::Decrease => "Decrease",
        }
    }
}

/// One bar of the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeStep {
    pub label: String,
    pub kind: StepKind,
    /// The total for `Total` steps, otherwise the signed change.
    pub amount: f64,
    /// Lower edge of the bar. Zero for totals.
    pub base: f64,
}

impl BridgeStep {
    /// Bar height.
    pub fn magnitude(&self) -> f64 {
        self.amount.abs()
    }

    /// Upper edge of the bar.
    pub fn top(&self) -> f64 {
        self.base + self.magnitude()
    }
}

/// Build the bridge for a result.
///
/// Changes are ordered by signed amount, largest first; ties keep the
/// canonical category order. A zero change counts as an increase.
pub fn variance_bridge(result: &ProjectionResult, periods: &PeriodLabels) -> Vec<BridgeStep> {
    let records = result.records();
    let prior: f64 = records.iter().map(|r| r.amount_prior).sum();
    let projected: f64 = records.iter().map(|r| r.amount_projected).sum();

    let mut changes: Vec<_> = records
        .iter()
        .map(|r| (r.category.label(), r.absolute_variation()))
        .collect();
    changes.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut steps = Vec::with_capacity(changes.len() + 2);
    steps.push(BridgeStep {
        label: format!("Total {}", periods.prior),
        kind: StepKind::Total,
        amount: prior,
        base: 0.0,
    });
    let mut level = prior;
    for (label, delta) in changes {
        let (kind, base) = if delta >= 0.0 {
            (StepKind::Increase, level)
        } else {
            (StepKind::Decrease, level + delta)
        };
        steps.push(BridgeStep {
            label: label.to_string(),
            kind,
            amount: delta,
            base,
        });
        level += delta;
    }
    steps.push(BridgeStep {
        label: format!("Total {}", periods.projected),
        kind: StepKind::Total,
        amount: projected,
        base: 0.0,
    });
    steps
}

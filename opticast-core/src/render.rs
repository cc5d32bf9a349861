//! Terminal rendering of a projection: headline metrics, a grouped bar chart,
//! the variance bridge, a detail table and the narrative.
//!
//! Rendering is a pure function of the result and the options. Output is
//! plain text; colouring is left to the caller.

use unicode_width::UnicodeWidthStr;

use crate::bridge::{BridgeStep, StepKind, variance_bridge};
use crate::config::PeriodLabels;
use crate::projection::ProjectionResult;

const PRIOR_BAR: char = '█';
const PROJECTED_BAR: char = '▒';
const TOTAL_BAR: char = '█';
const INCREASE_BAR: char = '▓';
const DECREASE_BAR: char = '░';
const MIN_BAR_WIDTH: usize = 10;

/// Layout options for [`render`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Target width in columns.
    pub width: usize,
    pub periods: PeriodLabels,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 100,
            periods: PeriodLabels::default(),
        }
    }
}

/// A headline figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

/// Everything shown on screen for one projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub metrics: Vec<Metric>,
    pub chart: String,
    pub bridge: String,
    pub table: String,
    pub narrative: String,
}

impl Dashboard {
    /// The headline metrics on a single line.
    pub fn metrics_line(&self) -> String {
        self.metrics
            .iter()
            .map(|m| format!("{}: {}", m.label, m.value))
            .collect::<Vec<_>>()
            .join("    ")
    }

    /// The whole dashboard as plain text.
    pub fn to_text(&self) -> String {
        format!(
            "{}\n\n{}\n\n{}\n\n{}\n\n{}\n",
            self.metrics_line(),
            self.chart,
            self.bridge,
            self.table,
            self.narrative
        )
    }
}

/// Render a projection result.
pub fn render(result: &ProjectionResult, options: &RenderOptions) -> Dashboard {
    let kpis = result.kpis();
    let metrics = vec![
        Metric {
            label: format!("Total {}", options.periods.prior),
            value: format_currency(kpis.total_prior),
        },
        Metric {
            label: format!("Projected {}", options.periods.projected),
            value: format_currency(kpis.total_projected),
        },
        Metric {
            label: "Variation".to_string(),
            value: format_percent(kpis.variation_percent),
        },
    ];

    Dashboard {
        metrics,
        chart: render_chart(result, options),
        bridge: render_bridge(&variance_bridge(result, &options.periods), options.width),
        table: render_table(result, options),
        narrative: textwrap::fill(result.analysis(), options.width.max(20)),
    }
}

/// `$1,234,568` style: dollar sign, thousands separators, no decimals,
/// rounded half away from zero. Negative amounts render as `-$1,234`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = group_thousands(&format!("{:.0}", rounded.abs()));
    if rounded < 0.0 {
        format!("-${digits}")
    } else {
        format!("${digits}")
    }
}

/// Currency with an explicit sign: `+$16,525`, `-$10,000`. Zero stays `$0`.
pub fn format_signed_currency(value: f64) -> String {
    let text = format_currency(value);
    if text.starts_with('-') || text == "$0" {
        text
    } else {
        format!("+{text}")
    }
}

/// The percentage exactly as given, followed by `%` (`5.65%`, `5%`).
pub fn format_percent(value: f64) -> String {
    format!("{value}%")
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn pad_right(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

fn pad_left(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{text}", " ".repeat(fill))
}

fn render_chart(result: &ProjectionResult, options: &RenderOptions) -> String {
    let records = result.records();
    let label_width = records
        .iter()
        .map(|r| r.category.label().width())
        .max()
        .unwrap_or(0);
    let value_width = records
        .iter()
        .flat_map(|r| [r.amount_prior, r.amount_projected])
        .map(|v| format_currency(v).width())
        .max()
        .unwrap_or(0);
    let bar_width = options
        .width
        .saturating_sub(label_width + value_width + 3)
        .max(MIN_BAR_WIDTH);
    let max = records
        .iter()
        .flat_map(|r| [r.amount_prior, r.amount_projected])
        .fold(0.0_f64, f64::max);

    let bar = |value: f64, glyph: char| -> String {
        let len = if max > 0.0 && value > 0.0 {
            ((value / max) * bar_width as f64).round() as usize
        } else {
            0
        };
        let mut s: String = std::iter::repeat_n(glyph, len).collect();
        s.push_str(&" ".repeat(bar_width - len.min(bar_width)));
        s
    };

    let mut lines = vec![format!(
        "{} {}   {} {}",
        PRIOR_BAR, options.periods.prior, PROJECTED_BAR, options.periods.projected
    )];
    for record in records {
        lines.push(format!(
            "{} {} {}",
            pad_right(record.category.label(), label_width),
            bar(record.amount_prior, PRIOR_BAR),
            format_currency(record.amount_prior)
        ));
        lines.push(format!(
            "{} {} {}",
            " ".repeat(label_width),
            bar(record.amount_projected, PROJECTED_BAR),
            format_currency(record.amount_projected)
        ));
    }
    lines
        .iter()
        .map(|l| l.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_bridge(steps: &[BridgeStep], width: usize) -> String {
    let value = |step: &BridgeStep| match step.kind {
        StepKind::Total => format_currency(step.amount),
        StepKind::Increase | StepKind::Decrease => format_signed_currency(step.amount),
    };
    let label_width = steps.iter().map(|s| s.label.width()).max().unwrap_or(0);
    let value_width = steps.iter().map(|s| value(s).width()).max().unwrap_or(0);
    let bar_width = width
        .saturating_sub(label_width + value_width + 2)
        .max(MIN_BAR_WIDTH);
    let max = steps.iter().map(BridgeStep::top).fold(0.0_f64, f64::max);
    let scale = |v: f64| -> usize {
        if max > 0.0 && v > 0.0 {
            ((v / max) * bar_width as f64).round() as usize
        } else {
            0
        }
    };

    steps
        .iter()
        .map(|step| {
            let offset = scale(step.base).min(bar_width);
            let mut len = scale(step.magnitude());
            if len == 0 && step.magnitude() > 0.0 {
                len = 1;
            }
            let len = len.min(bar_width - offset);
            let glyph = match step.kind {
                StepKind::Total => TOTAL_BAR,
                StepKind::Increase => INCREASE_BAR,
                StepKind::Decrease => DECREASE_BAR,
            };
            let line = format!(
                "{} {} {}{}",
                pad_right(&step.label, label_width),
                pad_left(&value(step), value_width),
                " ".repeat(offset),
                std::iter::repeat_n(glyph, len).collect::<String>()
            );
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_table(result: &ProjectionResult, options: &RenderOptions) -> String {
    let header: [&str; 4] = [
        "Category",
        &options.periods.prior,
        &options.periods.projected,
        "Factor",
    ];
    let rows: Vec<[String; 4]> = result
        .records()
        .iter()
        .map(|r| {
            [
                r.category.label().to_string(),
                format_currency(r.amount_prior),
                format_currency(r.amount_projected),
                r.applied_factor()
                    .map_or_else(|| "-".to_string(), |f| format!("{f:.3}x")),
            ]
        })
        .collect();

    let mut widths = header.map(|h| h.width());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }

    let format_row = |cells: [&str; 4]| {
        let mut line = pad_right(cells[0], widths[0]);
        for (cell, width) in cells.iter().zip(widths).skip(1) {
            line.push_str("  ");
            line.push_str(&pad_left(cell, width));
        }
        line
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(header));
    lines.push("─".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    for row in &rows {
        lines.push(format_row(row.each_ref().map(String::as_str)));
    }
    lines.join("\n")
}

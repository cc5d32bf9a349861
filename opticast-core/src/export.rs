//! Spreadsheet report export.
//!
//! Builds a three-sheet `.xlsx` workbook (Summary with the variance bridge,
//! Detail Matrix, Assumptions) entirely in memory. Nothing is written to disk here; the
//! caller decides what to do with the returned [`ReportDocument`].

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::bridge::variance_bridge;
use crate::config::{OptiCastConfig, PeriodLabels};
use crate::drivers::DriverTable;
use crate::error::ExportError;
use crate::inputs::InputSet;
use crate::projection::ProjectionResult;

pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const SUMMARY_SHEET: &str = "Summary";
pub const DETAIL_SHEET: &str = "Detail Matrix";
pub const ASSUMPTIONS_SHEET: &str = "Assumptions";

const CURRENCY_FORMAT: &str = "$#,##0";
const PERCENT_FORMAT: &str = "0.00%";
const DRIVER_PERCENT_FORMAT: &str = "0.0%";
const FACTOR_FORMAT: &str = "0.000\"x\"";

/// Rows spanned by the merged narrative block on the Summary sheet.
const NARRATIVE_ROWS: u32 = 12;
/// Last column (F) of the merged narrative block.
const NARRATIVE_LAST_COL: u16 = 5;

/// A generated report, ready to be offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Builds a downloadable report from a projection.
pub trait ReportBuilder: Send + Sync {
    fn build(
        &self,
        result: &ProjectionResult,
        inputs: &InputSet,
        generated_at: NaiveDateTime,
    ) -> Result<ReportDocument, ExportError>;
}

/// `OptiCast_Report_<YYYYMMDD_HHMM>.xlsx`.
pub fn report_filename(generated_at: NaiveDateTime) -> String {
    generated_at
        .format("OptiCast_Report_%Y%m%d_%H%M.xlsx")
        .to_string()
}

/// The `.xlsx` report exporter.
#[derive(Debug, Clone)]
pub struct XlsxReportExporter {
    title: String,
    model: String,
    drivers: DriverTable,
    periods: PeriodLabels,
}

struct Formats {
    bold: Format,
    currency: Format,
    percent: Format,
    driver_percent: Format,
    factor: Format,
    narrative: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            bold: Format::new().set_bold(),
            currency: Format::new().set_num_format(CURRENCY_FORMAT),
            percent: Format::new().set_num_format(PERCENT_FORMAT),
            driver_percent: Format::new().set_num_format(DRIVER_PERCENT_FORMAT),
            factor: Format::new().set_num_format(FACTOR_FORMAT),
            narrative: Format::new()
                .set_text_wrap()
                .set_align(FormatAlign::Top)
                .set_align(FormatAlign::Left),
        }
    }
}

impl XlsxReportExporter {
    pub fn new(title: &str, model: &str, drivers: DriverTable, periods: PeriodLabels) -> Self {
        Self {
            title: title.to_string(),
            model: model.to_string(),
            drivers,
            periods,
        }
    }

    /// An exporter using the report title, model, drivers and periods from `config`.
    pub fn from_config(config: &OptiCastConfig) -> Self {
        Self::new(
            &config.report.title,
            &config.service.model,
            config.drivers.clone(),
            config.periods.clone(),
        )
    }

    fn write_summary(
        &self,
        sheet: &mut Worksheet,
        fmt: &Formats,
        result: &ProjectionResult,
        generated_at: NaiveDateTime,
    ) -> Result<(), XlsxError> {
        let kpis = result.kpis();
        sheet.set_column_width(0, 30)?;
        sheet.set_column_width(1, 20)?;
        sheet.set_column_width(2, 20)?;
        sheet.set_column_width(3, 20)?;

        sheet.write_string_with_format(0, 0, &self.title, &fmt.bold)?;
        sheet.write_string(1, 0, "Generated")?;
        sheet.write_string(1, 1, generated_at.format("%Y-%m-%d %H:%M:%S").to_string())?;
        sheet.write_string(2, 0, "Model")?;
        sheet.write_string(2, 1, &self.model)?;

        sheet.write_string_with_format(4, 0, "Indicator", &fmt.bold)?;
        sheet.write_string_with_format(4, 1, "Value", &fmt.bold)?;
        sheet.write_string_with_format(4, 2, "Status", &fmt.bold)?;
        sheet.write_string(5, 0, format!("Total {}", self.periods.prior))?;
        sheet.write_number_with_format(5, 1, kpis.total_prior, &fmt.currency)?;
        sheet.write_string(5, 2, "Baseline")?;
        sheet.write_string(6, 0, format!("Total {}", self.periods.projected))?;
        sheet.write_number_with_format(6, 1, kpis.total_projected, &fmt.currency)?;
        sheet.write_string(6, 2, "Target")?;
        sheet.write_string(7, 0, "Variation")?;
        let ratio = if kpis.variation_percent == 0.0 {
            0.0
        } else {
            kpis.variation_percent / 100.0
        };
        sheet.write_number_with_format(7, 1, ratio, &fmt.percent)?;
        let yoy = kpis.total_projected - kpis.total_prior;
        sheet.write_string(8, 0, "YoY Variation")?;
        sheet.write_number_with_format(8, 1, yoy, &fmt.currency)?;
        sheet.write_string(8, 2, if yoy > 0.0 { "Cost increase" } else { "Savings" })?;

        sheet.write_string_with_format(10, 0, "Variance Bridge", &fmt.bold)?;
        for (col, header) in ["Step", "Amount", "Cumulative Start", "Movement"]
            .into_iter()
            .enumerate()
        {
            sheet.write_string_with_format(11, col as u16, header, &fmt.bold)?;
        }
        let mut row = 12u32;
        for step in variance_bridge(result, &self.periods) {
            sheet.write_string(row, 0, &step.label)?;
            sheet.write_number_with_format(row, 1, step.magnitude(), &fmt.currency)?;
            sheet.write_number_with_format(row, 2, step.base, &fmt.currency)?;
            sheet.write_string(row, 3, step.kind.label())?;
            row += 1;
        }

        row += 1;
        sheet.write_string_with_format(row, 0, "Executive Analysis", &fmt.bold)?;
        sheet.merge_range(
            row + 1,
            0,
            row + NARRATIVE_ROWS,
            NARRATIVE_LAST_COL,
            result.analysis(),
            &fmt.narrative,
        )?;
        Ok(())
    }

    fn write_detail(
        &self,
        sheet: &mut Worksheet,
        fmt: &Formats,
        result: &ProjectionResult,
    ) -> Result<(), XlsxError> {
        for (col, width) in [22, 20, 20, 20, 16, 16].into_iter().enumerate() {
            sheet.set_column_width(col as u16, width)?;
        }

        let headers = [
            "Category".to_string(),
            self.periods.prior.clone(),
            self.periods.projected.clone(),
            "Absolute Variation".to_string(),
            "Relative Variation".to_string(),
            "Applied Factor".to_string(),
        ];
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, header, &fmt.bold)?;
        }

        for (i, record) in result.records().iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, record.category.label())?;
            sheet.write_number_with_format(row, 1, record.amount_prior, &fmt.currency)?;
            sheet.write_number_with_format(row, 2, record.amount_projected, &fmt.currency)?;
            sheet.write_number_with_format(row, 3, record.absolute_variation(), &fmt.currency)?;
            sheet.write_number_with_format(row, 4, record.relative_variation(), &fmt.percent)?;
            // Left blank when there is no prior amount to scale.
            if let Some(factor) = record.applied_factor() {
                sheet.write_number_with_format(row, 5, factor, &fmt.factor)?;
            }
        }
        Ok(())
    }

    fn write_assumptions(
        &self,
        sheet: &mut Worksheet,
        fmt: &Formats,
        inputs: &InputSet,
    ) -> Result<(), XlsxError> {
        sheet.set_column_width(0, 25)?;
        sheet.set_column_width(1, 15)?;
        sheet.set_column_width(2, 50)?;

        sheet.write_string_with_format(0, 0, "Category", &fmt.bold)?;
        sheet.write_string_with_format(
            0,
            1,
            format!("{} Amount", self.periods.prior),
            &fmt.bold,
        )?;
        let mut row = 1u32;
        for (category, amount) in inputs.iter() {
            sheet.write_string(row, 0, category.label())?;
            sheet.write_number_with_format(row, 1, amount, &fmt.currency)?;
            row += 1;
        }

        // One blank row between the tables.
        row += 1;
        sheet.write_string_with_format(row, 0, "Category", &fmt.bold)?;
        sheet.write_string_with_format(row, 1, "Adjustment", &fmt.bold)?;
        sheet.write_string_with_format(row, 2, "Justification", &fmt.bold)?;
        for driver in self.drivers.iter() {
            row += 1;
            sheet.write_string(row, 0, driver.category.label())?;
            sheet.write_number_with_format(row, 1, driver.adjustment_ratio(), &fmt.driver_percent)?;
            sheet.write_string(row, 2, &driver.justification)?;
        }
        Ok(())
    }
}

fn sheet_error(sheet: &str) -> impl Fn(XlsxError) -> ExportError + '_ {
    move |e| ExportError::Sheet {
        sheet: sheet.to_string(),
        message: e.to_string(),
    }
}

impl ReportBuilder for XlsxReportExporter {
    fn build(
        &self,
        result: &ProjectionResult,
        inputs: &InputSet,
        generated_at: NaiveDateTime,
    ) -> Result<ReportDocument, ExportError> {
        let fmt = Formats::new();
        let mut workbook = Workbook::new();

        let summary = workbook
            .add_worksheet()
            .set_name(SUMMARY_SHEET)
            .map_err(sheet_error(SUMMARY_SHEET))?;
        self.write_summary(summary, &fmt, result, generated_at)
            .map_err(sheet_error(SUMMARY_SHEET))?;

        let detail = workbook
            .add_worksheet()
            .set_name(DETAIL_SHEET)
            .map_err(sheet_error(DETAIL_SHEET))?;
        self.write_detail(detail, &fmt, result)
            .map_err(sheet_error(DETAIL_SHEET))?;

        let assumptions = workbook
            .add_worksheet()
            .set_name(ASSUMPTIONS_SHEET)
            .map_err(sheet_error(ASSUMPTIONS_SHEET))?;
        self.write_assumptions(assumptions, &fmt, inputs)
            .map_err(sheet_error(ASSUMPTIONS_SHEET))?;

        let bytes = workbook
            .save_to_buffer()
            .map_err(|e| ExportError::Serialize {
                message: e.to_string(),
            })?;

        let filename = report_filename(generated_at);
        info!(filename = filename.as_str(), bytes = bytes.len(), "Report exported");
        Ok(ReportDocument {
            filename,
            mime_type: XLSX_MIME_TYPE.to_string(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 33)
            .unwrap()
    }

    #[test]
    fn test_report_filename() {
        assert_eq!(report_filename(at()), "OptiCast_Report_20260309_1405.xlsx");
    }

    #[test]
    fn test_build_produces_xlsx_bytes() {
        let result = ProjectionResult::parse(
            r#"{"analysis": "Stable.", "records": [
                {"category": "Contractors", "amount_prior": 1, "amount_projected": 1},
                {"category": "Labor", "amount_prior": 1, "amount_projected": 1},
                {"category": "Fuel", "amount_prior": 1, "amount_projected": 1},
                {"category": "Power", "amount_prior": 1, "amount_projected": 1},
                {"category": "Maintenance", "amount_prior": 1, "amount_projected": 1}
            ], "kpis": {"total_prior": 5, "total_projected": 5, "variation_percent": 0}}"#,
        )
        .unwrap();
        let inputs = InputSet::from_amounts([1.0; 5]).unwrap();
        let exporter = XlsxReportExporter::from_config(&OptiCastConfig::default());

        let doc = exporter.build(&result, &inputs, at()).unwrap();
        assert_eq!(doc.mime_type, XLSX_MIME_TYPE);
        assert_eq!(doc.filename, "OptiCast_Report_20260309_1405.xlsx");
        // xlsx files are zip archives.
        assert_eq!(&doc.bytes[..2], b"PK");
    }
}

//! Per-session state: the current inputs, the last successful projection and
//! its rendered dashboard, and the state of the report download.

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::client::ProjectionClient;
use crate::error::{ExportError, ProjectionError};
use crate::export::{ReportBuilder, ReportDocument};
use crate::inputs::InputSet;
use crate::projection::ProjectionResult;
use crate::render::{Dashboard, RenderOptions, render};

/// Whether a report can be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadState {
    /// No projection has succeeded yet.
    NotRequested,
    Ready(ReportDocument),
    /// The projection succeeded but the report could not be built.
    Unavailable { error: ExportError },
}

/// Session state, owned by a single operator.
#[derive(Debug, Clone)]
pub struct SessionContext {
    defaults: InputSet,
    inputs: InputSet,
    result: Option<ProjectionResult>,
    dashboard: Option<Dashboard>,
    download: DownloadState,
}

impl SessionContext {
    pub fn new(defaults: InputSet) -> Self {
        Self {
            defaults,
            inputs: defaults,
            result: None,
            dashboard: None,
            download: DownloadState::NotRequested,
        }
    }

    pub fn inputs(&self) -> &InputSet {
        &self.inputs
    }

    pub fn set_inputs(&mut self, inputs: InputSet) {
        self.inputs = inputs;
    }

    pub fn result(&self) -> Option<&ProjectionResult> {
        self.result.as_ref()
    }

    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.dashboard.as_ref()
    }

    pub fn download(&self) -> &DownloadState {
        &self.download
    }

    /// The report, when one is ready.
    pub fn report(&self) -> Option<&ReportDocument> {
        match &self.download {
            DownloadState::Ready(doc) => Some(doc),
            _ => None,
        }
    }

    /// Request a projection for the current inputs and, on success, render it
    /// and build the report.
    ///
    /// On failure the previous dashboard and download are left untouched.
    pub async fn run(
        &mut self,
        client: &ProjectionClient,
        exporter: &dyn ReportBuilder,
        options: &RenderOptions,
    ) -> Result<&Dashboard, ProjectionError> {
        let result = client.project(&self.inputs).await.inspect_err(|e| {
            warn!(kind = %e.kind(), error = %e, "Projection failed");
        })?;
        let generated_at = chrono::Local::now().naive_local();
        Ok(self.accept(result, exporter, options, generated_at))
    }

    /// Store a successful projection: render it, then try to build the report.
    ///
    /// A report failure only marks the download unavailable.
    pub fn accept(
        &mut self,
        result: ProjectionResult,
        exporter: &dyn ReportBuilder,
        options: &RenderOptions,
        generated_at: NaiveDateTime,
    ) -> &Dashboard {
        let dashboard = render(&result, options);
        self.download = match exporter.build(&result, &self.inputs, generated_at) {
            Ok(doc) => DownloadState::Ready(doc),
            Err(e) => {
                warn!(error = %e, "Report export failed; download disabled");
                DownloadState::Unavailable { error: e }
            }
        };
        self.result = Some(result);
        self.dashboard.insert(dashboard)
    }

    /// Discard the projection and download, and restore the default inputs.
    pub fn reset(&mut self) {
        info!("Session reset");
        self.inputs = self.defaults;
        self.result = None;
        self.dashboard = None;
        self.download = DownloadState::NotRequested;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::Category;

    struct FailingBuilder;

    impl ReportBuilder for FailingBuilder {
        fn build(
            &self,
            _result: &ProjectionResult,
            _inputs: &InputSet,
            _generated_at: NaiveDateTime,
        ) -> Result<ReportDocument, ExportError> {
            Err(ExportError::Sheet {
                sheet: "Summary".to_string(),
                message: "writer missing".to_string(),
            })
        }
    }

    struct StubBuilder;

    impl ReportBuilder for StubBuilder {
        fn build(
            &self,
            _result: &ProjectionResult,
            _inputs: &InputSet,
            _generated_at: NaiveDateTime,
        ) -> Result<ReportDocument, ExportError> {
            Ok(ReportDocument {
                filename: "r.xlsx".to_string(),
                mime_type: "x".to_string(),
                bytes: vec![1, 2, 3],
            })
        }
    }

    fn result() -> ProjectionResult {
        ProjectionResult::parse(
            r#"{"analysis": "flat", "records": [
                {"category": "Contractors", "amount_prior": 2, "amount_projected": 2},
                {"category": "Labor", "amount_prior": 2, "amount_projected": 2},
                {"category": "Fuel", "amount_prior": 2, "amount_projected": 2},
                {"category": "Power", "amount_prior": 2, "amount_projected": 2},
                {"category": "Maintenance", "amount_prior": 2, "amount_projected": 2}
            ], "kpis": {"total_prior": 10, "total_projected": 10, "variation_percent": 0}}"#,
        )
        .unwrap()
    }

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    #[test]
    fn test_failing_export_keeps_dashboard() {
        let mut session = SessionContext::new(InputSet::from_amounts([2.0; 5]).unwrap());
        session.accept(result(), &FailingBuilder, &RenderOptions::default(), now());

        assert!(session.dashboard().is_some());
        assert!(session.result().is_some());
        assert!(session.report().is_none());
        match session.download() {
            DownloadState::Unavailable { error } => {
                assert!(error.to_string().contains("writer missing"));
                assert!(error.likely_cause().contains("spreadsheet cell"));
            }
            other => panic!("unexpected download state: {other:?}"),
        }
    }

    #[test]
    fn test_successful_export_is_ready() {
        let mut session = SessionContext::new(InputSet::from_amounts([2.0; 5]).unwrap());
        session.accept(result(), &StubBuilder, &RenderOptions::default(), now());
        assert_eq!(session.report().unwrap().bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let defaults = InputSet::from_amounts([2.0; 5]).unwrap();
        let mut session = SessionContext::new(defaults);
        let mut changed = defaults;
        changed.set(Category::Fuel, 9.0).unwrap();
        session.set_inputs(changed);
        session.accept(result(), &StubBuilder, &RenderOptions::default(), now());

        session.reset();
        assert!(session.dashboard().is_none());
        assert!(session.result().is_none());
        assert_eq!(session.download(), &DownloadState::NotRequested);
        assert_eq!(session.inputs(), &defaults);
    }
}

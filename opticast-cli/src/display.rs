//! Terminal presentation: colours, the dashboard, error panels and the
//! progress spinner.

use std::io::Write;
use std::time::Duration;

use crossterm::{cursor, execute, terminal};
use opticast_core::error::{ExportError, FailureKind, ProjectionError};
use opticast_core::render::Dashboard;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[90m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const RED: &str = "\x1b[31m";
pub const CYAN: &str = "\x1b[36m";
pub const RESET: &str = "\x1b[0m";

/// Applies ANSI styles when colour output is enabled.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn paint(&self, style: &str, text: &str) -> String {
        if self.color {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Print the rendered dashboard.
pub fn print_dashboard(painter: Painter, title: &str, dashboard: &Dashboard) {
    println!();
    println!("{}", painter.paint(BOLD, title));
    println!();
    let metrics: Vec<String> = dashboard
        .metrics
        .iter()
        .map(|m| format!("{} {}", painter.paint(DIM, &m.label), painter.paint(BOLD, &m.value)))
        .collect();
    println!("  {}", metrics.join("    "));
    println!();
    println!("{}", painter.paint(CYAN, "Comparison"));
    println!("{}", dashboard.chart);
    println!();
    println!("{}", painter.paint(CYAN, "Variance Bridge"));
    println!("{}", dashboard.bridge);
    println!();
    println!("{}", painter.paint(CYAN, "Detail"));
    println!("{}", dashboard.table);
    println!();
    println!("{}", painter.paint(CYAN, "Analysis"));
    println!("{}", dashboard.narrative);
    println!();
}

/// One-line headline for a projection failure.
pub fn failure_headline(err: &ProjectionError) -> &'static str {
    match err.kind() {
        FailureKind::Configuration => "Configuration problem",
        FailureKind::Transport => "Projection service error",
        FailureKind::Parse => "Unusable reply from the projection service",
    }
}

/// What the operator can do about a failure.
pub fn failure_hint(err: &ProjectionError, api_key_env: &str) -> String {
    match err {
        ProjectionError::MissingCredential { .. } => format!(
            "Set {api_key_env}, run `opticast auth login`, or pass --api-key."
        ),
        ProjectionError::AuthRejected { .. } => {
            "Check that the API key is valid and enabled for the Generative Language API."
                .to_string()
        }
        ProjectionError::QuotaExceeded { .. } => {
            "The API quota is exhausted; wait before trying again.".to_string()
        }
        ProjectionError::Timeout { .. } => {
            "Raise service.timeout_secs or try again later.".to_string()
        }
        ProjectionError::ServiceUnavailable { status: 404, .. } => {
            "Check service.model; the model may not be available for this key.".to_string()
        }
        ProjectionError::MalformedResponse { .. } => {
            "Run again, or with -v to see the offending reply.".to_string()
        }
        _ => "Try again later.".to_string(),
    }
}

/// Print a projection failure. Previous results, if any, are not reprinted.
pub fn print_projection_error(painter: Painter, err: &ProjectionError, api_key_env: &str) {
    eprintln!();
    eprintln!(
        "{} {}",
        painter.paint(RED, "✗"),
        painter.paint(BOLD, failure_headline(err))
    );
    eprintln!("  {err}");
    if let ProjectionError::MalformedResponse { preview, .. } = err {
        tracing::debug!(preview = preview.as_str(), "Malformed reply preview");
    }
    eprintln!("  {}", painter.paint(DIM, &failure_hint(err, api_key_env)));
}

/// Lines explaining why the report cannot be downloaded.
pub fn export_warning_lines(err: &ExportError) -> [String; 3] {
    [
        format!("Report download unavailable: {err}"),
        format!("Likely cause: {}", err.likely_cause()),
        "The results above are unaffected.".to_string(),
    ]
}

pub fn print_export_unavailable(painter: Painter, err: &ExportError) {
    let [headline, cause, note] = export_warning_lines(err);
    eprintln!("{} {}", painter.paint(YELLOW, "!"), headline);
    eprintln!("  {cause}");
    eprintln!("  {}", painter.paint(DIM, &note));
}

/// A progress indicator shown on stderr while a request is in flight.
pub struct Spinner {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    const FRAMES: [&'static str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

    /// Start spinning. When `enabled` is false nothing is drawn.
    pub fn start(message: &str, enabled: bool) -> Self {
        if !enabled {
            return Self {
                stop: None,
                handle: None,
            };
        }
        let (tx, mut rx) = oneshot::channel::<()>();
        let message = message.to_string();
        let handle = tokio::spawn(async move {
            let mut stderr = std::io::stderr();
            let _ = execute!(stderr, cursor::Hide);
            let mut frame = 0usize;
            loop {
                let _ = execute!(
                    stderr,
                    cursor::MoveToColumn(0),
                    terminal::Clear(terminal::ClearType::CurrentLine)
                );
                let _ = write!(stderr, "{} {}", Self::FRAMES[frame], message);
                let _ = stderr.flush();
                frame = (frame + 1) % Self::FRAMES.len();
                tokio::select! {
                    _ = &mut rx => break,
                    _ = tokio::time::sleep(Duration::from_millis(80)) => {}
                }
            }
            let _ = execute!(
                stderr,
                cursor::MoveToColumn(0),
                terminal::Clear(terminal::ClearType::CurrentLine),
                cursor::Show
            );
        });
        Self {
            stop: Some(tx),
            handle: Some(handle),
        }
    }

    /// Stop and erase the spinner.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

//! The projection run: inputs, credential, request, dashboard, download.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Context;
use dialoguer::{Confirm, Password};
use opticast_core::config::{OptiCastConfig, load_config};
use opticast_core::credentials::{
    Credential, CredentialSource, KeyringCredentialStore, resolve_credential,
    resolve_deployment_credential,
};
use opticast_core::export::{ReportDocument, XlsxReportExporter};
use opticast_core::render::RenderOptions;
use opticast_core::session::{DownloadState, SessionContext};
use opticast_core::{ProjectionClient, ProjectionError};

use crate::RunArgs;
use crate::display::{self, GREEN, Painter, YELLOW};
use crate::input;

/// Apply run flags on top of the loaded configuration.
pub fn apply_overrides(config: &mut OptiCastConfig, args: &RunArgs) {
    if let Some(model) = &args.model {
        config.service.model = model.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.report.output_dir = dir.clone();
    }
    if let Some(width) = args.width {
        config.ui.width = width;
    }
    if args.no_color {
        config.ui.color = false;
    }
}

/// Write the report into `dir`, creating it if needed. Returns the file path.
pub fn save_report(doc: &ReportDocument, dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&doc.filename);
    std::fs::write(&path, &doc.bytes)?;
    Ok(path)
}

/// Deployment secrets first; then the `--api-key` flag or a masked prompt.
fn acquire_credential(
    config: &OptiCastConfig,
    args: &RunArgs,
    interactive: bool,
) -> Result<(Credential, CredentialSource), ProjectionError> {
    let store = KeyringCredentialStore::new();
    if let Some(found) = resolve_deployment_credential(&config.service, &store) {
        return Ok(found);
    }
    let manual = match &args.api_key {
        Some(key) => Some(key.clone()),
        None if interactive => Password::new()
            .with_prompt("Gemini API key")
            .allow_empty_password(true)
            .interact()
            .ok(),
        None => None,
    };
    resolve_credential(&config.service, &store, manual.as_deref())
}

pub async fn run(
    args: RunArgs,
    workspace: &Path,
    config_path: Option<&Path>,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(Some(workspace), config_path)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    apply_overrides(&mut config, &args);
    for warning in config.service.validate() {
        tracing::warn!("{}", warning);
    }

    let terminal = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
    let painter = Painter::new(config.ui.color && std::io::stdout().is_terminal());

    let defaults = config
        .inputs
        .to_input_set()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let inputs = if args.interactive {
        input::prompt_inputs(&args, &defaults, &config.inputs, &config.periods.prior)?
    } else {
        input::from_flags(&args, &defaults)?
    };

    let (credential, source) = match acquire_credential(&config, &args, terminal) {
        Ok(found) => found,
        Err(e) => {
            display::print_projection_error(painter, &e, &config.service.api_key_env);
            return Err(anyhow::anyhow!("no API key available"));
        }
    };
    tracing::debug!(%source, "Resolved API key");

    let client = match ProjectionClient::gemini(&config, credential) {
        Ok(client) => client,
        Err(e) => {
            display::print_projection_error(painter, &e, &config.service.api_key_env);
            return Err(anyhow::anyhow!("projection client could not be built"));
        }
    };
    let exporter = XlsxReportExporter::from_config(&config);
    let options = RenderOptions {
        width: config.ui.width,
        periods: config.periods.clone(),
    };

    let mut session = SessionContext::new(defaults);
    session.set_inputs(inputs);

    let spinner = display::Spinner::start(
        &format!("Projecting {} with {}...", config.periods.projected, client.model_name()),
        !quiet && std::io::stderr().is_terminal(),
    );
    let outcome = session.run(&client, &exporter, &options).await.cloned();
    spinner.stop().await;

    let dashboard = match outcome {
        Ok(dashboard) => dashboard,
        Err(e) => {
            display::print_projection_error(painter, &e, &config.service.api_key_env);
            return Err(anyhow::anyhow!("projection failed ({} error)", e.kind()));
        }
    };
    display::print_dashboard(painter, &config.report.title, &dashboard);

    if let Some(result) = session.result() {
        for warning in result.consistency_warnings() {
            println!("{} {}", painter.paint(YELLOW, "!"), warning);
        }
    }

    match session.download() {
        DownloadState::Ready(doc) => {
            if args.no_export {
                return Ok(());
            }
            let wanted = args.export
                || (terminal
                    && Confirm::new()
                        .with_prompt(format!("Download report ({})?", doc.filename))
                        .default(true)
                        .interact()?);
            if wanted {
                let path = save_report(doc, &config.report.output_dir).with_context(|| {
                    format!(
                        "Failed to save report to {}",
                        config.report.output_dir.display()
                    )
                })?;
                println!("{} Report saved to {}", painter.paint(GREEN, "✓"), path.display());
            }
        }
        DownloadState::Unavailable { error } => {
            display::print_export_unavailable(painter, error);
        }
        DownloadState::NotRequested => {}
    }
    Ok(())
}

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{config, load_settings, ClientSettings, FormController, SubmitOutcome};
use shared::domain::{FieldName, StudyingAnswer};
use tracing_subscriber::EnvFilter;

mod render;
mod session;

use session::{FormSession, SessionOutcome};

// Info-level lines would interleave with the interactive prompts.
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser, Debug)]
#[command(about = "Fill in and submit the personal details form")]
struct Args {
    /// Endpoint the form is posted to.
    #[arg(long)]
    endpoint: Option<String>,
    /// Settings file; defaults to ./form.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Post the record even when it fails validation.
    #[arg(long)]
    no_enforce_validation: bool,

    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    middle_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    age: Option<String>,
    /// yes or no
    #[arg(long)]
    studying: Option<String>,
    #[arg(long)]
    name_studying: Option<String>,
    #[arg(long)]
    extra_information: Option<String>,
}

impl Args {
    fn field_values(&self) -> Vec<(FieldName, &str)> {
        [
            (FieldName::FirstName, &self.first_name),
            (FieldName::MiddleName, &self.middle_name),
            (FieldName::LastName, &self.last_name),
            (FieldName::Email, &self.email),
            (FieldName::Age, &self.age),
            (FieldName::Studying, &self.studying),
            (FieldName::NameStudying, &self.name_studying),
            (FieldName::ExtraInformation, &self.extra_information),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }

    fn settings(&self) -> Result<ClientSettings> {
        let mut settings =
            load_settings(self.config.as_deref()).context("failed to load form settings")?;
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint_url = config::parse_endpoint(endpoint)?;
        }
        if let Some(secs) = self.timeout_secs {
            settings.request_timeout = config::timeout_from_secs(secs)?;
        }
        if self.no_enforce_validation {
            settings.enforce_validation = false;
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = args.settings()?;
    tracing::info!(endpoint = %settings.endpoint_url, "form: settings loaded");
    let controller = FormController::new(settings);

    let ctrl_c_controller = Arc::clone(&controller);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !ctrl_c_controller.cancel_submission().await {
                std::process::exit(130);
            }
        }
    });

    let fields = args.field_values();
    if fields.is_empty() {
        run_interactive(controller).await
    } else {
        submit_once(&controller, &fields).await
    }
}

async fn run_interactive(controller: Arc<FormController>) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut session = FormSession::new(controller, stdin, tokio::io::stdout());
    match session.run().await? {
        SessionOutcome::Submitted | SessionOutcome::Cleared | SessionOutcome::Cancelled => Ok(()),
        SessionOutcome::GaveUp(failure) => Err(failure.into()),
    }
}

async fn submit_once(controller: &FormController, fields: &[(FieldName, &str)]) -> Result<()> {
    for &(field, value) in fields {
        if field == FieldName::Studying {
            let answer: StudyingAnswer = value.parse()?;
            controller.set_studying(answer).await;
        } else {
            controller.set_field(field, value).await;
        }
    }

    let record = controller.record().await;
    controller.validate_email_on_blur(&record.email).await;
    controller.validate_age_on_blur(&record.age).await;
    let validation = controller.validation_state().await;
    for field in [FieldName::Email, FieldName::Age] {
        if let Some(text) = render::helper_text(field, &validation) {
            eprintln!("{}: {text}", field.label());
        }
    }

    eprintln!("Submitting...");
    let outcome = controller.submit().await?;
    let state = controller.submission_state().await;
    if let Some(line) = render::submission_line(&state) {
        println!("{line}");
    }

    match outcome {
        SubmitOutcome::Completed { response } => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        SubmitOutcome::Failed(failure) => Err(failure.into()),
        SubmitOutcome::Cancelled => bail!("submission cancelled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}

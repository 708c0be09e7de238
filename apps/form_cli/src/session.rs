//! Interactive terminal walk through the form.

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use client_core::{FormController, SubmitError, SubmitOutcome};
use shared::{
    domain::{FieldName, StudyingAnswer},
    error::SubmissionFailure,
    validation::{FieldIssue, IssueKind},
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::render;

const INDICATOR_TICK: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Submitted,
    Cleared,
    Cancelled,
    GaveUp(SubmissionFailure),
}

pub struct FormSession<R, W> {
    controller: Arc<FormController>,
    input: R,
    output: W,
}

impl<R, W> FormSession<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(controller: Arc<FormController>, input: R, output: W) -> Self {
        Self {
            controller,
            input,
            output,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub async fn run(&mut self) -> Result<SessionOutcome> {
        self.write_line(render::TITLE).await?;
        self.write_line(render::SUBTITLE).await?;
        self.write_line("").await?;

        self.write_line("Personal details").await?;
        for field in [FieldName::FirstName, FieldName::MiddleName, FieldName::LastName] {
            self.ask_text(field).await?;
        }
        self.ask_email().await?;
        self.ask_age().await?;
        self.write_line("").await?;

        self.ask_studying().await?;
        if self.controller.is_studying().await {
            self.write_line(render::STUDY_DETAILS_PROMPT).await?;
            self.ask_text(FieldName::NameStudying).await?;
        }
        self.write_line("").await?;

        self.write_line("Extra information?").await?;
        self.ask_text(FieldName::ExtraInformation).await?;
        self.write_line("").await?;

        self.write_line("Complete form").await?;
        let snapshot = self.controller.snapshot().await;
        for line in render::summary(&snapshot) {
            self.write_line(&line).await?;
        }

        if !self.confirm("Submit? [Y/n]: ", true).await? {
            self.controller.reset().await?;
            self.write_line("Form cleared").await?;
            return Ok(SessionOutcome::Cleared);
        }

        self.submit_until_settled().await
    }

    async fn submit_until_settled(&mut self) -> Result<SessionOutcome> {
        let mut retrying = false;
        loop {
            let outcome = match self.submit_with_indicator(retrying).await? {
                Ok(outcome) => outcome,
                Err(SubmitError::Invalid(report)) => {
                    for issue in &report.issues {
                        self.write_line(&issue.to_string()).await?;
                    }
                    bail!(report);
                }
                Err(err) => return Err(err.into()),
            };

            let state = self.controller.submission_state().await;
            if let Some(line) = render::submission_line(&state) {
                self.write_line(&line).await?;
            }

            match outcome {
                SubmitOutcome::Completed { .. } => return Ok(SessionOutcome::Submitted),
                SubmitOutcome::Failed(failure) => {
                    if !self.confirm("Retry? [y/N]: ", false).await? {
                        return Ok(SessionOutcome::GaveUp(failure));
                    }
                    retrying = true;
                }
                SubmitOutcome::Cancelled => {
                    self.write_line("Submission cancelled").await?;
                    if !self.confirm("Submit again? [y/N]: ", false).await? {
                        return Ok(SessionOutcome::Cancelled);
                    }
                    retrying = false;
                }
            }
        }
    }

    /// Runs the submission while printing a progress indicator.
    async fn submit_with_indicator(
        &mut self,
        retrying: bool,
    ) -> Result<Result<SubmitOutcome, SubmitError>> {
        let controller = Arc::clone(&self.controller);
        let submit = async move {
            if retrying {
                controller.retry().await
            } else {
                controller.submit().await
            }
        };
        tokio::pin!(submit);

        self.output.write_all(b"Submitting").await?;
        self.output.flush().await?;

        let mut ticker = tokio::time::interval(INDICATOR_TICK);
        ticker.tick().await;
        let result = loop {
            tokio::select! {
                result = &mut submit => break result,
                _ = ticker.tick() => {
                    self.output.write_all(b".").await?;
                    self.output.flush().await?;
                }
            }
        };

        self.write_line("").await?;
        Ok(result)
    }

    async fn ask_text(&mut self, field: FieldName) -> Result<()> {
        loop {
            let value = self.prompt(&render::field_prompt(field)).await?;

            let issue = if field.is_required() && value.trim().is_empty() {
                Some(IssueKind::Missing)
            } else {
                field
                    .max_len()
                    .filter(|max| value.chars().count() > *max)
                    .map(|max| IssueKind::TooLong { max })
            };
            if let Some(kind) = issue {
                self.write_line(&FieldIssue { field, kind }.to_string()).await?;
                continue;
            }

            self.controller.set_field(field, value).await;
            return Ok(());
        }
    }

    async fn ask_email(&mut self) -> Result<()> {
        loop {
            let value = self.prompt(&render::field_prompt(FieldName::Email)).await?;
            self.controller.set_field(FieldName::Email, value.as_str()).await;
            if self.controller.validate_email_on_blur(&value).await {
                return Ok(());
            }
            if !self.show_helper_text(FieldName::Email).await? {
                return Ok(());
            }
        }
    }

    async fn ask_age(&mut self) -> Result<()> {
        loop {
            let value = self.prompt(&render::field_prompt(FieldName::Age)).await?;
            self.controller.set_field(FieldName::Age, value.as_str()).await;
            if self.controller.validate_age_on_blur(&value).await {
                return Ok(());
            }
            if !self.show_helper_text(FieldName::Age).await? {
                return Ok(());
            }
        }
    }

    /// Prints the field's helper text. Returns whether the field must be
    /// asked again, which is only the case when submission enforces validity.
    async fn show_helper_text(&mut self, field: FieldName) -> Result<bool> {
        let validation = self.controller.validation_state().await;
        if let Some(text) = render::helper_text(field, &validation) {
            self.write_line(text).await?;
        }
        Ok(self.controller.settings().enforce_validation)
    }

    async fn ask_studying(&mut self) -> Result<()> {
        loop {
            let value = self.prompt(&render::field_prompt(FieldName::Studying)).await?;
            match StudyingAnswer::parse(&value) {
                Some(answer) => {
                    self.controller.set_studying(answer).await;
                    return Ok(());
                }
                None => self.write_line("Please answer yes or no").await?,
            }
        }
    }

    async fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        loop {
            let answer = self.prompt(question).await?;
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.write_line("Please answer y or n").await?,
            }
        }
    }

    async fn prompt(&mut self, prompt: &str) -> Result<String> {
        self.output.write_all(prompt.as_bytes()).await?;
        self.output.flush().await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            bail!("input closed before the form was completed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.output.write_all(line.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

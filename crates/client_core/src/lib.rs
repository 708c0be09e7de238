use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::{FieldName, Record, StudyingAnswer},
    error::{FailureCategory, SubmissionFailure},
    validation::{is_valid_age, is_valid_email, validate_record, ValidationReport},
};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod config;
pub mod transport;

pub use config::{load_settings, ClientSettings, SettingsError};
pub use transport::{HttpSubmissionTransport, SubmissionTransport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationState {
    pub is_correct_email: bool,
    pub is_correct_age: bool,
}

impl Default for ValidationState {
    fn default() -> Self {
        Self {
            is_correct_email: true,
            is_correct_age: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    InFlight {
        attempt_id: Uuid,
    },
    Completed {
        attempt_id: Uuid,
        completed_at: DateTime<Utc>,
        response: serde_json::Value,
    },
    Failed {
        attempt_id: Uuid,
        failure: SubmissionFailure,
    },
}

impl SubmissionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SubmissionState::InFlight { .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SubmissionState::Completed { .. })
    }

    pub fn failure(&self) -> Option<&SubmissionFailure> {
        match self {
            SubmissionState::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormSnapshot {
    pub record: Arc<Record>,
    pub validation: ValidationState,
    pub submission: SubmissionState,
}

impl FormSnapshot {
    pub fn is_studying(&self) -> bool {
        self.record.is_studying()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    RecordChanged(FieldName),
    ValidationChanged(ValidationState),
    SubmissionChanged(SubmissionState),
    Reset,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    AlreadyInFlight,
    #[error(transparent)]
    Invalid(#[from] ValidationReport),
    #[error("only a failed submission can be retried")]
    NotRetryable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Completed { response: serde_json::Value },
    Failed(SubmissionFailure),
    Cancelled,
}

struct FormState {
    record: Arc<Record>,
    validation: ValidationState,
    submission: SubmissionState,
    cancel: Option<oneshot::Sender<()>>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            record: Arc::new(Record::default()),
            validation: ValidationState::default(),
            submission: SubmissionState::Idle,
            cancel: None,
        }
    }
}

/// Owns the record under edit, its validation flags and the submission
/// lifecycle. At most one submission is in flight at a time.
pub struct FormController {
    settings: ClientSettings,
    transport: Arc<dyn SubmissionTransport>,
    inner: Arc<Mutex<FormState>>,
    events: broadcast::Sender<FormEvent>,
}

impl FormController {
    pub fn new(settings: ClientSettings) -> Arc<Self> {
        let transport = Arc::new(HttpSubmissionTransport::new(settings.endpoint_url.clone()));
        Self::with_transport(settings, transport)
    }

    pub fn with_transport(
        settings: ClientSettings,
        transport: Arc<dyn SubmissionTransport>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            settings,
            transport,
            inner: Arc::new(Mutex::new(FormState::default())),
            events,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FormEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: FormEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub async fn snapshot(&self) -> FormSnapshot {
        let inner = self.inner.lock().await;
        FormSnapshot {
            record: Arc::clone(&inner.record),
            validation: inner.validation,
            submission: inner.submission.clone(),
        }
    }

    pub async fn record(&self) -> Arc<Record> {
        Arc::clone(&self.inner.lock().await.record)
    }

    pub async fn validation_state(&self) -> ValidationState {
        self.inner.lock().await.validation
    }

    pub async fn submission_state(&self) -> SubmissionState {
        self.inner.lock().await.submission.clone()
    }

    pub async fn is_studying(&self) -> bool {
        self.inner.lock().await.record.is_studying()
    }

    pub async fn set_field(&self, field: FieldName, value: impl Into<String>) {
        {
            let mut inner = self.inner.lock().await;
            inner.record = Arc::new(inner.record.with_field(field, value));
        }
        debug!(field = field.as_str(), "form: field changed");
        self.emit(FormEvent::RecordChanged(field));
    }

    /// Hiding the study details keeps whatever was typed there.
    pub async fn set_studying(&self, answer: StudyingAnswer) {
        self.set_field(FieldName::Studying, answer.as_str()).await;
    }

    pub async fn validate_email_on_blur(&self, value: &str) -> bool {
        let valid = is_valid_email(value);
        self.update_validation(|v| v.is_correct_email = valid).await;
        valid
    }

    pub async fn validate_age_on_blur(&self, value: &str) -> bool {
        let valid = is_valid_age(value);
        self.update_validation(|v| v.is_correct_age = valid).await;
        valid
    }

    async fn update_validation(&self, apply: impl FnOnce(&mut ValidationState)) {
        let changed = {
            let mut inner = self.inner.lock().await;
            let before = inner.validation;
            apply(&mut inner.validation);
            (inner.validation != before).then_some(inner.validation)
        };
        if let Some(validation) = changed {
            self.emit(FormEvent::ValidationChanged(validation));
        }
    }

    pub async fn reset(&self) -> Result<(), SubmitError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.submission.is_in_flight() {
                return Err(SubmitError::AlreadyInFlight);
            }
            *inner = FormState::default();
        }
        info!("form: reset");
        self.emit(FormEvent::Reset);
        Ok(())
    }

    pub async fn submit(&self) -> Result<SubmitOutcome, SubmitError> {
        let record = self.record().await;
        self.run_submission(&record, false).await
    }

    /// Submits the given record snapshot. The record under edit is left as is.
    pub async fn submit_record(&self, record: Record) -> Result<SubmitOutcome, SubmitError> {
        self.run_submission(&record, false).await
    }

    pub async fn retry(&self) -> Result<SubmitOutcome, SubmitError> {
        let record = self.record().await;
        self.run_submission(&record, true).await
    }

    /// Aborts the in-flight request, returning the form to idle. Returns
    /// `false` when nothing was in flight.
    pub async fn cancel_submission(&self) -> bool {
        let cancel = self.inner.lock().await.cancel.take();
        match cancel {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    async fn run_submission(
        &self,
        record: &Record,
        retrying: bool,
    ) -> Result<SubmitOutcome, SubmitError> {
        let (guard, cancel_rx) = self.begin_submission(record, retrying).await?;
        let attempt_id = guard.attempt_id;
        info!(
            attempt_id = %attempt_id,
            endpoint = %self.settings.endpoint_url,
            retrying,
            "form: submission dispatched"
        );

        let timeout = self.settings.request_timeout;
        let outcome = tokio::select! {
            result = tokio::time::timeout(timeout, self.transport.post_record(record)) => {
                match result {
                    Ok(Ok(response)) => SubmitOutcome::Completed { response },
                    Ok(Err(err)) => {
                        SubmitOutcome::Failed(SubmissionFailure::new(err.category(), err.to_string()))
                    }
                    Err(_) => SubmitOutcome::Failed(SubmissionFailure::new(
                        FailureCategory::Timeout,
                        format!("no response within {}s", timeout.as_secs_f64()),
                    )),
                }
            }
            _ = cancel_rx => SubmitOutcome::Cancelled,
        };

        self.finish_submission(attempt_id, &outcome).await;
        guard.disarm();
        Ok(outcome)
    }

    async fn begin_submission(
        &self,
        record: &Record,
        retrying: bool,
    ) -> Result<(InFlightGuard, oneshot::Receiver<()>), SubmitError> {
        let mut inner = self.inner.lock().await;

        if inner.submission.is_in_flight() {
            warn!("form: submit ignored, a submission is already in flight");
            return Err(SubmitError::AlreadyInFlight);
        }
        if retrying && inner.submission.failure().is_none() {
            return Err(SubmitError::NotRetryable);
        }

        if self.settings.enforce_validation {
            if let Err(report) = validate_record(record) {
                // The flags describe the record under edit, not a detached snapshot.
                let mut changed = None;
                if *inner.record == *record {
                    let validation = ValidationState {
                        is_correct_email: is_valid_email(&record.email),
                        is_correct_age: is_valid_age(&record.age),
                    };
                    if inner.validation != validation {
                        inner.validation = validation;
                        changed = Some(validation);
                    }
                }
                drop(inner);

                if let Some(validation) = changed {
                    self.emit(FormEvent::ValidationChanged(validation));
                }
                info!(issues = report.issues.len(), "form: submission blocked by validation");
                return Err(SubmitError::Invalid(report));
            }
        }

        let attempt_id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        inner.submission = SubmissionState::InFlight { attempt_id };
        inner.cancel = Some(cancel_tx);
        let state = inner.submission.clone();
        drop(inner);

        self.emit(FormEvent::SubmissionChanged(state));
        let guard = InFlightGuard {
            state: Arc::clone(&self.inner),
            events: self.events.clone(),
            attempt_id,
            armed: true,
        };
        Ok((guard, cancel_rx))
    }

    async fn finish_submission(&self, attempt_id: Uuid, outcome: &SubmitOutcome) {
        let next = match outcome {
            SubmitOutcome::Completed { response } => {
                info!(attempt_id = %attempt_id, "form: submission completed");
                SubmissionState::Completed {
                    attempt_id,
                    completed_at: Utc::now(),
                    response: response.clone(),
                }
            }
            SubmitOutcome::Failed(failure) => {
                warn!(
                    attempt_id = %attempt_id,
                    category = ?failure.category,
                    error = %failure.message,
                    "form: submission failed"
                );
                SubmissionState::Failed {
                    attempt_id,
                    failure: failure.clone(),
                }
            }
            SubmitOutcome::Cancelled => {
                info!(attempt_id = %attempt_id, "form: submission cancelled");
                SubmissionState::Idle
            }
        };

        {
            let mut inner = self.inner.lock().await;
            inner.cancel = None;
            inner.submission = next.clone();
        }
        self.emit(FormEvent::SubmissionChanged(next));
    }
}

/// Returns the form to idle if a submission future is dropped before it
/// settles, so an abandoned `submit()` cannot leave the controller in flight.
struct InFlightGuard {
    state: Arc<Mutex<FormState>>,
    events: broadcast::Sender<FormEvent>,
    attempt_id: Uuid,
    armed: bool,
}

impl InFlightGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let attempt_id = self.attempt_id;
        if let Ok(mut inner) = self.state.try_lock() {
            release_abandoned(&mut inner, attempt_id, &self.events);
            return;
        }
        // Lock is busy; finish the release on the runtime once it frees up.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let state = Arc::clone(&self.state);
            let events = self.events.clone();
            handle.spawn(async move {
                let mut inner = state.lock().await;
                release_abandoned(&mut inner, attempt_id, &events);
            });
        }
    }
}

fn release_abandoned(
    inner: &mut FormState,
    attempt_id: Uuid,
    events: &broadcast::Sender<FormEvent>,
) {
    let still_ours = matches!(
        inner.submission,
        SubmissionState::InFlight { attempt_id: current } if current == attempt_id
    );
    if !still_ours {
        return;
    }
    inner.submission = SubmissionState::Idle;
    inner.cancel = None;
    warn!(attempt_id = %attempt_id, "form: submission abandoned before it settled");
    let _ = events.send(FormEvent::SubmissionChanged(SubmissionState::Idle));
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

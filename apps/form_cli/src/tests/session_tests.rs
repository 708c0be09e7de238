use super::*;

use std::collections::VecDeque;

use async_trait::async_trait;
use client_core::{ClientSettings, SubmissionTransport, TransportError};
use serde_json::json;
use shared::{domain::Record, error::FailureCategory};
use tokio::{io::BufReader, sync::Mutex};

struct RecordingTransport {
    replies: Mutex<VecDeque<Result<serde_json::Value, TransportError>>>,
    posted: Mutex<Vec<Record>>,
}

impl RecordingTransport {
    fn new(replies: Vec<Result<serde_json::Value, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            posted: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SubmissionTransport for RecordingTransport {
    async fn post_record(&self, record: &Record) -> Result<serde_json::Value, TransportError> {
        self.posted.lock().await.push(record.clone());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(json!({ "id": 1 })))
    }
}

async fn run_session(
    transport: Arc<RecordingTransport>,
    input: &str,
) -> (Result<SessionOutcome>, String, Arc<FormController>) {
    let controller = FormController::with_transport(ClientSettings::default(), transport);
    let mut session = FormSession::new(
        Arc::clone(&controller),
        BufReader::new(input.as_bytes()),
        Vec::new(),
    );
    let outcome = session.run().await;
    let output = String::from_utf8(session.into_output()).expect("utf8 output");
    (outcome, output, controller)
}

#[tokio::test]
async fn walks_the_form_and_submits() {
    let transport = RecordingTransport::new(Vec::new());
    let input = [
        "",                 // first name, required
        "Jane",
        "",                 // middle name, optional
        "Doe",
        "foo@",
        "jane@doe.com",
        "18",
        "30",
        "maybe",
        "yes",
        "Physics",
        "",                 // extra information
        "",                 // submit, default yes
    ]
    .join("\n")
        + "\n";

    let (outcome, output, controller) = run_session(transport.clone(), &input).await;

    assert_eq!(outcome.expect("session"), SessionOutcome::Submitted);
    assert!(output.contains("First Name is required"), "{output}");
    assert!(output.contains("Incorrect email"), "{output}");
    assert!(output.contains("Incorrect age"), "{output}");
    assert!(output.contains("Please answer yes or no"), "{output}");
    assert!(output.contains(render::STUDY_DETAILS_PROMPT), "{output}");
    assert!(output.contains("Form submitted"), "{output}");

    let posted = transport.posted.lock().await;
    assert_eq!(
        *posted,
        vec![Record {
            first_name: "Jane".into(),
            middle_name: String::new(),
            last_name: "Doe".into(),
            email: "jane@doe.com".into(),
            age: "30".into(),
            studying: "study-yes".into(),
            name_studying: "Physics".into(),
            extra_information: String::new(),
        }]
    );
    assert!(controller.submission_state().await.is_completed());
}

#[tokio::test]
async fn study_details_are_skipped_when_not_studying() {
    let transport = RecordingTransport::new(Vec::new());
    let input = "Jane\n\nDoe\njane@doe.com\n30\nno\n\ny\n";

    let (outcome, output, _) = run_session(transport.clone(), input).await;

    assert_eq!(outcome.expect("session"), SessionOutcome::Submitted);
    assert!(!output.contains(render::STUDY_DETAILS_PROMPT), "{output}");
    assert_eq!(transport.posted.lock().await[0].studying, "study-no");
}

#[tokio::test]
async fn failed_submission_can_be_retried() {
    let transport = RecordingTransport::new(vec![
        Err(TransportError::Status { status: 503 }),
        Ok(json!({ "id": 2 })),
    ]);
    let input = "Jane\n\nDoe\njane@doe.com\n30\nno\n\ny\ny\n";

    let (outcome, output, _) = run_session(transport.clone(), input).await;

    assert_eq!(outcome.expect("session"), SessionOutcome::Submitted);
    assert!(output.contains("The server rejected the form"), "{output}");
    assert!(output.contains("Form submitted"), "{output}");
    assert_eq!(transport.posted.lock().await.len(), 2);
}

#[tokio::test]
async fn declining_retry_reports_the_failure() {
    let transport = RecordingTransport::new(vec![Err(TransportError::Status { status: 500 })]);
    let input = "Jane\n\nDoe\njane@doe.com\n30\nno\n\ny\nn\n";

    let (outcome, _, controller) = run_session(transport, input).await;

    let SessionOutcome::GaveUp(failure) = outcome.expect("session") else {
        panic!("expected the session to give up");
    };
    assert_eq!(failure.category, FailureCategory::Status);
    assert!(controller.submission_state().await.failure().is_some());
}

#[tokio::test]
async fn declining_submit_clears_the_form() {
    let transport = RecordingTransport::new(Vec::new());
    let input = "Jane\n\nDoe\njane@doe.com\n30\nno\nnotes\nn\n";

    let (outcome, output, controller) = run_session(transport.clone(), input).await;

    assert_eq!(outcome.expect("session"), SessionOutcome::Cleared);
    assert!(output.contains("Form cleared"), "{output}");
    assert!(transport.posted.lock().await.is_empty());
    assert_eq!(*controller.record().await, Record::default());
}

#[tokio::test]
async fn closed_input_is_an_error() {
    let transport = RecordingTransport::new(Vec::new());
    let (outcome, _, _) = run_session(transport, "Jane\n").await;

    let err = outcome.expect_err("must fail");
    assert!(err.to_string().contains("input closed"), "{err}");
}

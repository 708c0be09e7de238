//! Text projection of controller state. Nothing here mutates the form.

use client_core::{FormSnapshot, SubmissionState, ValidationState};
use shared::domain::{FieldName, StudyingAnswer};

pub const TITLE: &str = "ReadyTech Task";
pub const SUBTITLE: &str = "This is a form.";
pub const STUDY_DETAILS_PROMPT: &str = "Please provide the name(s) of what you are studying.";
pub const SUBMITTED: &str = "Form submitted";

pub fn field_prompt(field: FieldName) -> String {
    let mut prompt = field.label().to_string();
    if field == FieldName::Studying {
        prompt.push_str(" [yes/no]");
    }
    if field.is_required() {
        prompt.push_str(" *");
    } else if matches!(field, FieldName::MiddleName) {
        prompt.push_str(" (optional)");
    }
    prompt.push_str(": ");
    prompt
}

/// Inline helper text shown under a field after it loses focus.
pub fn helper_text(field: FieldName, validation: &ValidationState) -> Option<&'static str> {
    match field {
        FieldName::Email if !validation.is_correct_email => Some("Incorrect email"),
        FieldName::Age if !validation.is_correct_age => Some("Incorrect age"),
        _ => None,
    }
}

pub fn submission_line(state: &SubmissionState) -> Option<String> {
    match state {
        SubmissionState::Idle => None,
        SubmissionState::InFlight { .. } => Some("Submitting".to_string()),
        SubmissionState::Completed { .. } => Some(SUBMITTED.to_string()),
        SubmissionState::Failed { failure, .. } => Some(failure.user_message()),
    }
}

/// Review lines printed before the user confirms submission. Study details
/// only appear while they are presented.
pub fn summary(snapshot: &FormSnapshot) -> Vec<String> {
    FieldName::ALL
        .into_iter()
        .filter(|field| *field != FieldName::NameStudying || snapshot.is_studying())
        .map(|field| {
            let value = snapshot.record.get(field);
            let value = if field == FieldName::Studying {
                match snapshot.record.studying_answer() {
                    Some(StudyingAnswer::Yes) => "Yes",
                    Some(StudyingAnswer::No) => "No",
                    None => value,
                }
            } else {
                value
            };
            format!("  {:<28} {}", field.label(), value)
        })
        .collect()
}

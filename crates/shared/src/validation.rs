use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{FieldName, Record, StudyingAnswer};

pub const AGE_EXCLUSIVE_MIN: i64 = 18;
pub const AGE_EXCLUSIVE_MAX: i64 = 100;

// ECMAScript `\s` and line terminators. The regex crate's `\s` and `.` use
// different sets (`\s` adds U+0085 and drops U+FEFF, `.` admits `\r`).
const JS_WHITESPACE: &str =
    r"\t\n\x0B\x0C\r \x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}";
const JS_LINE_TERMINATORS: &str = r"\n\r\x{2028}\x{2029}";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let atom = format!(r#"[^<>()\[\]\\.,;:@"{JS_WHITESPACE}]"#);
    let pattern = format!(
        r#"^(({atom}+(\.{atom}+)*)|("[^{JS_LINE_TERMINATORS}]+"))@((\[[0-9]{{1,3}}\.[0-9]{{1,3}}\.[0-9]{{1,3}}\.[0-9]{{1,3}}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{{2,}}))$"#
    );
    Regex::new(&pattern).expect("valid email regex")
});

/// `local-part@domain`, where the local part is either dot-separated atoms
/// free of `<>()[]\.,;:@"` and whitespace, or a quoted string, and the domain
/// is a bracketed dotted quad or labels ending in an alphabetic TLD of two or
/// more letters.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Leading-integer parse: surrounding whitespace and a sign are allowed, and
/// parsing stops at the first non-digit. `None` when no digit leads.
pub fn parse_age(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }

    let magnitude = digits.bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

pub fn is_valid_age(raw: &str) -> bool {
    parse_age(raw).is_some_and(|age| AGE_EXCLUSIVE_MIN < age && age < AGE_EXCLUSIVE_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    TooLong { max: usize },
    InvalidEmail,
    InvalidAge,
    InvalidStudying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: FieldName,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.field.label();
        match self.kind {
            IssueKind::Missing => write!(f, "{label} is required"),
            IssueKind::TooLong { max } => write!(f, "{label} must be at most {max} characters"),
            IssueKind::InvalidEmail => f.write_str("Incorrect email"),
            IssueKind::InvalidAge => f.write_str("Incorrect age"),
            IssueKind::InvalidStudying => write!(f, "{label} must be answered yes or no"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<FieldIssue>,
}

impl ValidationReport {
    pub fn has_issue(&self, field: FieldName) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        write!(f, "invalid form: {}", messages.join("; "))
    }
}

impl std::error::Error for ValidationReport {}

pub fn validate_record(record: &Record) -> Result<(), ValidationReport> {
    let mut issues = Vec::new();

    for field in FieldName::ALL {
        let value = record.get(field);
        if field.is_required() && value.trim().is_empty() {
            issues.push(FieldIssue {
                field,
                kind: IssueKind::Missing,
            });
            continue;
        }
        if let Some(max) = field.max_len() {
            if value.chars().count() > max {
                issues.push(FieldIssue {
                    field,
                    kind: IssueKind::TooLong { max },
                });
            }
        }
    }

    if !record.email.trim().is_empty() && !is_valid_email(&record.email) {
        issues.push(FieldIssue {
            field: FieldName::Email,
            kind: IssueKind::InvalidEmail,
        });
    }
    if !record.age.trim().is_empty() && !is_valid_age(&record.age) {
        issues.push(FieldIssue {
            field: FieldName::Age,
            kind: IssueKind::InvalidAge,
        });
    }
    if !record.studying.trim().is_empty() && StudyingAnswer::parse(&record.studying).is_none() {
        issues.push(FieldIssue {
            field: FieldName::Studying,
            kind: IssueKind::InvalidStudying,
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport { issues })
    }
}

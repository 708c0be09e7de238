use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::FormError;

pub const NAME_MAX_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    FirstName,
    MiddleName,
    LastName,
    Email,
    Age,
    Studying,
    NameStudying,
    ExtraInformation,
}

impl FieldName {
    pub const ALL: [FieldName; 8] = [
        FieldName::FirstName,
        FieldName::MiddleName,
        FieldName::LastName,
        FieldName::Email,
        FieldName::Age,
        FieldName::Studying,
        FieldName::NameStudying,
        FieldName::ExtraInformation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::FirstName => "firstName",
            FieldName::MiddleName => "middleName",
            FieldName::LastName => "lastName",
            FieldName::Email => "email",
            FieldName::Age => "age",
            FieldName::Studying => "studying",
            FieldName::NameStudying => "nameStudying",
            FieldName::ExtraInformation => "extraInformation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldName::FirstName => "First Name",
            FieldName::MiddleName => "Middle Name",
            FieldName::LastName => "Last Name",
            FieldName::Email => "Email",
            FieldName::Age => "Age",
            FieldName::Studying => "Are you currently studying?",
            FieldName::NameStudying => "Study details",
            FieldName::ExtraInformation => "Extra information",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(
            self,
            FieldName::FirstName
                | FieldName::LastName
                | FieldName::Email
                | FieldName::Age
                | FieldName::Studying
        )
    }

    pub fn max_len(self) -> Option<usize> {
        match self {
            FieldName::FirstName | FieldName::MiddleName | FieldName::LastName => {
                Some(NAME_MAX_LEN)
            }
            _ => None,
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| FormError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudyingAnswer {
    #[serde(rename = "study-yes")]
    Yes,
    #[serde(rename = "study-no")]
    No,
}

impl StudyingAnswer {
    pub fn as_str(self) -> &'static str {
        match self {
            StudyingAnswer::Yes => "study-yes",
            StudyingAnswer::No => "study-no",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "study-yes" | "yes" | "y" => Some(StudyingAnswer::Yes),
            "study-no" | "no" | "n" => Some(StudyingAnswer::No),
            _ => None,
        }
    }
}

impl fmt::Display for StudyingAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyingAnswer {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StudyingAnswer::parse(s).ok_or_else(|| FormError::InvalidStudyingAnswer(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub age: String,
    pub studying: String,
    pub name_studying: String,
    pub extra_information: String,
}

impl Record {
    pub fn get(&self, field: FieldName) -> &str {
        match field {
            FieldName::FirstName => &self.first_name,
            FieldName::MiddleName => &self.middle_name,
            FieldName::LastName => &self.last_name,
            FieldName::Email => &self.email,
            FieldName::Age => &self.age,
            FieldName::Studying => &self.studying,
            FieldName::NameStudying => &self.name_studying,
            FieldName::ExtraInformation => &self.extra_information,
        }
    }

    pub fn with_field(&self, field: FieldName, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        let slot = match field {
            FieldName::FirstName => &mut next.first_name,
            FieldName::MiddleName => &mut next.middle_name,
            FieldName::LastName => &mut next.last_name,
            FieldName::Email => &mut next.email,
            FieldName::Age => &mut next.age,
            FieldName::Studying => &mut next.studying,
            FieldName::NameStudying => &mut next.name_studying,
            FieldName::ExtraInformation => &mut next.extra_information,
        };
        *slot = value.into();
        next
    }

    pub fn studying_answer(&self) -> Option<StudyingAnswer> {
        StudyingAnswer::parse(&self.studying)
    }

    pub fn is_studying(&self) -> bool {
        self.studying_answer() == Some(StudyingAnswer::Yes)
    }
}

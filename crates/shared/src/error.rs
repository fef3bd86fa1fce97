use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Attendance, EntityKind};

const NOTICE_REQUIRED_FIELDS: &str = "Bitte füllen Sie alle Pflichtfelder aus.";
const NOTICE_TRY_LATER: &str =
    "Es ist ein Fehler aufgetreten. Bitte versuchen Sie es später erneut.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    Backend,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldProblem {
    Missing,
    OutOfRange,
    NotAllowed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub problem: FieldProblem,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let problem = match self.problem {
            FieldProblem::Missing => "is required",
            FieldProblem::OutOfRange => "is out of range",
            FieldProblem::NotAllowed => "is not an allowed value",
        };
        write!(f, "{} {problem}", self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} record: {}", join_issues(.issues))]
pub struct ValidationError {
    pub kind: EntityKind,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn has_issue(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure surfaced by the guest-data services. Nothing is retried; the
/// caller decides whether to offer another attempt.
#[derive(Debug, Error)]
pub enum GuestDataError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("backend request failed: {0}")]
    Backend(String),
    #[error("media upload failed: {0}")]
    Upload(String),
}

impl GuestDataError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::Backend(_) => ErrorCode::Backend,
            Self::Upload(_) => ErrorCode::Upload,
        }
    }
}

/// Inline message shown beneath a form after a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormNotice {
    pub text: String,
    pub error: bool,
}

impl FormNotice {
    pub fn success(kind: EntityKind) -> Self {
        let text = match kind {
            EntityKind::Rsvp => "Vielen Dank!",
            EntityKind::GuestbookEntry => "Vielen Dank für Ihren Eintrag!",
            EntityKind::MusicWish => "Vielen Dank für Ihren Musikwunsch!",
            EntityKind::GuestPhoto => "Vielen Dank! Ihre Fotos wurden erfolgreich hochgeladen.",
            EntityKind::ContactMessage => {
                "Vielen Dank für Ihre Nachricht! Wir melden uns in Kürze bei Ihnen."
            }
            EntityKind::ArchivePhoto => "Vielen Dank! Ihr Foto wurde gespeichert.",
        };
        Self {
            text: text.to_string(),
            error: false,
        }
    }

    pub fn rsvp_confirmation(attending: Option<Attendance>) -> Self {
        let text = match attending {
            Some(Attendance::Yes) => {
                "Wir freuen uns sehr, Sie auf unserer Hochzeit begrüßen zu dürfen."
            }
            _ => "Schade, dass Sie nicht dabei sein können. Sie werden uns fehlen.",
        };
        Self {
            text: text.to_string(),
            error: false,
        }
    }

    pub fn from_error(err: &GuestDataError) -> Self {
        let text = match err.code() {
            ErrorCode::Validation => NOTICE_REQUIRED_FIELDS,
            ErrorCode::Backend | ErrorCode::Upload => NOTICE_TRY_LATER,
        };
        Self {
            text: text.to_string(),
            error: true,
        }
    }
}

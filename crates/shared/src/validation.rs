use serde::{de::DeserializeOwned, Serialize};

use crate::{
    domain::{
        ArchivePhoto, ContactMessage, EntityKind, GuestPhoto, GuestbookEntry, MusicWish,
        RsvpResponse,
    },
    error::{FieldIssue, FieldProblem, ValidationError},
};

/// Deployment-specific limits on otherwise free-form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRules {
    /// Allowed archive categories. Empty means unrestricted.
    pub archive_categories: Vec<String>,
}

/// A record kind that can be submitted through the record store.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn validate(&self, rules: &ValidationRules) -> Result<(), ValidationError>;
}

#[derive(Default)]
struct Issues(Vec<FieldIssue>);

impl Issues {
    fn push(&mut self, field: &'static str, problem: FieldProblem) {
        self.0.push(FieldIssue { field, problem });
    }

    fn require(&mut self, field: &'static str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.push(field, FieldProblem::Missing);
            return false;
        }
        true
    }

    fn require_email(&mut self, field: &'static str, value: &str) {
        if self.require(field, value) && !looks_like_email(value) {
            self.push(field, FieldProblem::NotAllowed);
        }
    }

    fn require_url(&mut self, field: &'static str, value: &str) {
        let value = value.trim();
        if self.require(field, value)
            && !(value.starts_with("https://") || value.starts_with("http://"))
        {
            self.push(field, FieldProblem::NotAllowed);
        }
    }

    fn finish(self, kind: EntityKind) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                kind,
                issues: self.0,
            })
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

impl Entity for RsvpResponse {
    const KIND: EntityKind = EntityKind::Rsvp;

    fn validate(&self, _rules: &ValidationRules) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.require("name", &self.name);
        issues.require_email("email", &self.email);
        if self.guest_count == 0 {
            issues.push("guest_count", FieldProblem::OutOfRange);
        }
        issues.finish(Self::KIND)
    }
}

impl Entity for GuestbookEntry {
    const KIND: EntityKind = EntityKind::GuestbookEntry;

    fn validate(&self, _rules: &ValidationRules) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.require("name", &self.name);
        issues.require("message", &self.message);
        issues.finish(Self::KIND)
    }
}

impl Entity for MusicWish {
    const KIND: EntityKind = EntityKind::MusicWish;

    fn validate(&self, _rules: &ValidationRules) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.require("guest_name", &self.guest_name);
        issues.require("song_title", &self.song_title);
        issues.finish(Self::KIND)
    }
}

impl Entity for GuestPhoto {
    const KIND: EntityKind = EntityKind::GuestPhoto;

    fn validate(&self, _rules: &ValidationRules) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.require("guest_name", &self.guest_name);
        issues.require_url("image_url", &self.image_url);
        issues.finish(Self::KIND)
    }
}

impl Entity for ContactMessage {
    const KIND: EntityKind = EntityKind::ContactMessage;

    fn validate(&self, _rules: &ValidationRules) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.require("name", &self.name);
        issues.require_email("email", &self.email);
        issues.require("subject", &self.subject);
        issues.require("message", &self.message);
        issues.finish(Self::KIND)
    }
}

impl Entity for ArchivePhoto {
    const KIND: EntityKind = EntityKind::ArchivePhoto;

    fn validate(&self, rules: &ValidationRules) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.require_url("image_url", &self.image_url);
        if issues.require("category", &self.category)
            && !rules.archive_categories.is_empty()
            && !rules
                .archive_categories
                .iter()
                .any(|allowed| allowed == &self.category)
        {
            issues.push("category", FieldProblem::NotAllowed);
        }
        issues.finish(Self::KIND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Attendance;

    #[test]
    fn rsvp_requires_name_email_and_positive_guest_count() {
        let rules = ValidationRules::default();
        let err = RsvpResponse::new("  ", "not-an-email")
            .guest_count(0)
            .validate(&rules)
            .expect_err("invalid rsvp");
        assert!(err.has_issue("name"));
        assert!(err.has_issue("email"));
        assert!(err.has_issue("guest_count"));

        RsvpResponse::new("Anna", "anna@example.com")
            .attending(Some(Attendance::Yes))
            .guest_count(2)
            .validate(&rules)
            .expect("valid rsvp");
    }

    #[test]
    fn music_wish_requires_song_title() {
        let wish = MusicWish {
            guest_name: "Ben".into(),
            song_title: String::new(),
            artist: Some("ABBA".into()),
            note: None,
        };
        let err = wish
            .validate(&ValidationRules::default())
            .expect_err("missing title");
        assert_eq!(err.issues.len(), 1);
        assert!(err.has_issue("song_title"));
    }

    #[test]
    fn contact_message_requires_all_fields() {
        let message = ContactMessage {
            name: "Dora".into(),
            email: String::new(),
            subject: String::new(),
            message: String::new(),
        };
        let err = message
            .validate(&ValidationRules::default())
            .expect_err("missing fields");
        assert_eq!(err.issues.len(), 3);
    }

    #[test]
    fn archive_category_must_be_configured() {
        let rules = ValidationRules {
            archive_categories: vec!["ceremony".into(), "party".into()],
        };
        let mut photo = ArchivePhoto {
            image_url: "https://cdn.example.com/p.jpg".into(),
            caption: None,
            category: "afterparty".into(),
            guest_name: None,
        };
        let err = photo.validate(&rules).expect_err("unknown category");
        assert_eq!(err.issues[0].problem, FieldProblem::NotAllowed);

        photo.category = "party".into();
        photo.validate(&rules).expect("known category");
    }

    #[test]
    fn guest_photo_requires_uploaded_url() {
        let photo = GuestPhoto {
            guest_name: "Eva".into(),
            image_url: "file:///tmp/a.jpg".into(),
        };
        let err = photo
            .validate(&ValidationRules::default())
            .expect_err("local path");
        assert!(err.has_issue("image_url"));
    }
}

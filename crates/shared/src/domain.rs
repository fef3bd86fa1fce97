use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Backend-assigned record identifier. Hosted tables use bigint keys, demo
/// mode hands out random tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Numeric(i64),
    Token(String),
}

impl RecordId {
    pub fn generate() -> Self {
        Self::Token(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Token(token) => f.write_str(token),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Rsvp,
    GuestbookEntry,
    MusicWish,
    GuestPhoto,
    ContactMessage,
    ArchivePhoto,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Rsvp,
        EntityKind::GuestbookEntry,
        EntityKind::MusicWish,
        EntityKind::GuestPhoto,
        EntityKind::ContactMessage,
        EntityKind::ArchivePhoto,
    ];

    /// Backend table holding this kind of record.
    pub fn table(self) -> &'static str {
        match self {
            Self::Rsvp => "rsvp_responses",
            Self::GuestbookEntry => "guestbook_entries",
            Self::MusicWish => "music_wishes",
            Self::GuestPhoto => "guest_photos",
            Self::ContactMessage => "contact_messages",
            Self::ArchivePhoto => "archive_photos",
        }
    }

    /// Short name used on the command line and in export file names.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Rsvp => "rsvp",
            Self::GuestbookEntry => "guestbook",
            Self::MusicWish => "music_wishes",
            Self::GuestPhoto => "guest_photos",
            Self::ContactMessage => "contact_messages",
            Self::ArchivePhoto => "archive_photos",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == value || kind.table() == value)
            .ok_or_else(|| format!("unknown entity kind '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attendance {
    Yes,
    No,
}

impl FromStr for Attendance {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" | "ja" => Ok(Self::Yes),
            "no" | "nein" => Ok(Self::No),
            other => Err(format!("unknown attendance '{other}'")),
        }
    }
}

fn default_guest_count() -> u32 {
    1
}

fn guest_count_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_else(default_guest_count))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_approved() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpResponse {
    pub name: String,
    pub email: String,
    /// `None` until the guest has picked yes or no.
    pub attending: Option<Attendance>,
    /// Rows for declined guests may carry `null` here.
    #[serde(default = "default_guest_count", deserialize_with = "guest_count_or_default")]
    pub guest_count: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub menu_choice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RsvpResponse {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            attending: None,
            guest_count: 1,
            menu_choice: "Klassisch".to_string(),
            allergies: None,
            message: None,
        }
    }

    pub fn attending(mut self, attending: Option<Attendance>) -> Self {
        self.attending = attending;
        self
    }

    pub fn guest_count(mut self, guest_count: u32) -> Self {
        self.guest_count = guest_count;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestbookEntry {
    pub name: String,
    pub message: String,
    #[serde(default = "default_approved")]
    pub approved: bool,
}

impl GuestbookEntry {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            approved: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicWish {
    pub guest_name: String,
    pub song_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestPhoto {
    pub guest_name: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivePhoto {
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
}

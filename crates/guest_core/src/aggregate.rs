//! Admin figures, search and CSV export over fetched record lists. Nothing in
//! here mutates its input.

use chrono::NaiveDate;
use serde::Serialize;
use shared::{
    domain::{
        ArchivePhoto, Attendance, ContactMessage, EntityKind, GuestPhoto, GuestbookEntry,
        MusicWish, RsvpResponse,
    },
    protocol::Stored,
};

pub const CSV_SEPARATOR: char = ';';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RsvpStats {
    pub total_responses: usize,
    pub confirmed_count: usize,
    pub declined_count: usize,
    pub pending_count: usize,
    /// Sum of `guest_count` over confirmed responses only.
    pub total_guests: u64,
}

pub fn compute_rsvp_stats(records: &[Stored<RsvpResponse>]) -> RsvpStats {
    records
        .iter()
        .fold(RsvpStats::default(), |mut stats, record| {
            stats.total_responses += 1;
            match record.fields.attending {
                Some(Attendance::Yes) => {
                    stats.confirmed_count += 1;
                    stats.total_guests += u64::from(record.fields.guest_count);
                }
                Some(Attendance::No) => stats.declined_count += 1,
                None => stats.pending_count += 1,
            }
            stats
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub rsvp: RsvpStats,
    pub guestbook_entries: usize,
    pub guest_photos: usize,
    pub music_wishes: usize,
    pub contact_messages: usize,
}

pub fn summarize(
    rsvps: &[Stored<RsvpResponse>],
    guestbook: &[Stored<GuestbookEntry>],
    photos: &[Stored<GuestPhoto>],
    wishes: &[Stored<MusicWish>],
    contacts: &[Stored<ContactMessage>],
) -> DashboardSummary {
    DashboardSummary {
        rsvp: compute_rsvp_stats(rsvps),
        guestbook_entries: guestbook.len(),
        guest_photos: photos.len(),
        music_wishes: wishes.len(),
        contact_messages: contacts.len(),
    }
}

/// Fields consulted by [`search`].
pub trait Searchable {
    fn search_name(&self) -> Option<&str>;

    fn search_email(&self) -> Option<&str> {
        None
    }
}

impl Searchable for RsvpResponse {
    fn search_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn search_email(&self) -> Option<&str> {
        Some(&self.email)
    }
}

impl Searchable for GuestbookEntry {
    fn search_name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl Searchable for MusicWish {
    fn search_name(&self) -> Option<&str> {
        Some(&self.guest_name)
    }
}

impl Searchable for GuestPhoto {
    fn search_name(&self) -> Option<&str> {
        Some(&self.guest_name)
    }
}

impl Searchable for ContactMessage {
    fn search_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn search_email(&self) -> Option<&str> {
        Some(&self.email)
    }
}

impl Searchable for ArchivePhoto {
    fn search_name(&self) -> Option<&str> {
        self.guest_name.as_deref()
    }
}

/// Case-insensitive substring match on name and email. An empty query keeps
/// every record in its original order; whitespace is matched literally.
pub fn search<'a, E: Searchable>(records: &'a [Stored<E>], query: &str) -> Vec<&'a Stored<E>> {
    if query.is_empty() {
        return records.iter().collect();
    }
    let needle = query.to_lowercase();

    let matches = |value: Option<&str>| {
        value
            .map(|v| v.to_lowercase().contains(&needle))
            .unwrap_or(false)
    };
    records
        .iter()
        .filter(|record| {
            matches(record.fields.search_name()) || matches(record.fields.search_email())
        })
        .collect()
}

pub struct CsvColumn<E> {
    pub label: &'static str,
    pub value: fn(&Stored<E>) -> String,
}

impl<E> CsvColumn<E> {
    pub const fn new(label: &'static str, value: fn(&Stored<E>) -> String) -> Self {
        Self { label, value }
    }
}

/// Semicolon-separated table: a header row of labels, then one row per
/// record. Values are written as-is; a `;` inside a value is not escaped.
pub fn to_csv<'a, E: 'a, I>(records: I, columns: &[CsvColumn<E>]) -> String
where
    I: IntoIterator<Item = &'a Stored<E>>,
{
    let separator = CSV_SEPARATOR.to_string();
    let mut out = columns
        .iter()
        .map(|c| c.label)
        .collect::<Vec<_>>()
        .join(&separator);
    out.push('\n');

    for record in records {
        let row = columns
            .iter()
            .map(|c| (c.value)(record))
            .collect::<Vec<_>>()
            .join(&separator);
        out.push_str(&row);
        out.push('\n');
    }
    out
}

pub fn export_filename(kind: EntityKind, date: NaiveDate) -> String {
    format!("export_{}_{}.csv", kind.slug(), date.format("%Y-%m-%d"))
}

/// Default export layout for a record kind.
pub trait CsvExport: Sized {
    fn csv_columns() -> Vec<CsvColumn<Self>>;
}

fn submitted_at<E>(record: &Stored<E>) -> String {
    record.created_at.format("%Y-%m-%d %H:%M").to_string()
}

fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl CsvExport for RsvpResponse {
    fn csv_columns() -> Vec<CsvColumn<Self>> {
        vec![
            CsvColumn::<Self>::new("Name", |r| r.fields.name.clone()),
            CsvColumn::<Self>::new("E-Mail", |r| r.fields.email.clone()),
            CsvColumn::<Self>::new("Zusage", |r| {
                match r.fields.attending {
                    Some(Attendance::Yes) => "ja",
                    Some(Attendance::No) => "nein",
                    None => "offen",
                }
                .to_string()
            }),
            CsvColumn::<Self>::new("Personen", |r| r.fields.guest_count.to_string()),
            CsvColumn::<Self>::new("Menü", |r| r.fields.menu_choice.clone()),
            CsvColumn::<Self>::new("Allergien", |r| optional(&r.fields.allergies)),
            CsvColumn::<Self>::new("Nachricht", |r| optional(&r.fields.message)),
            CsvColumn::<Self>::new("Datum", submitted_at),
        ]
    }
}

impl CsvExport for GuestbookEntry {
    fn csv_columns() -> Vec<CsvColumn<Self>> {
        vec![
            CsvColumn::<Self>::new("Name", |r| r.fields.name.clone()),
            CsvColumn::<Self>::new("Nachricht", |r| r.fields.message.clone()),
            CsvColumn::<Self>::new("Freigegeben", |r| {
                if r.fields.approved { "ja" } else { "nein" }.to_string()
            }),
            CsvColumn::<Self>::new("Datum", submitted_at),
        ]
    }
}

impl CsvExport for MusicWish {
    fn csv_columns() -> Vec<CsvColumn<Self>> {
        vec![
            CsvColumn::<Self>::new("Gast", |r| r.fields.guest_name.clone()),
            CsvColumn::<Self>::new("Titel", |r| r.fields.song_title.clone()),
            CsvColumn::<Self>::new("Interpret", |r| optional(&r.fields.artist)),
            CsvColumn::<Self>::new("Notiz", |r| optional(&r.fields.note)),
            CsvColumn::<Self>::new("Datum", submitted_at),
        ]
    }
}

impl CsvExport for GuestPhoto {
    fn csv_columns() -> Vec<CsvColumn<Self>> {
        vec![
            CsvColumn::<Self>::new("Gast", |r| r.fields.guest_name.clone()),
            CsvColumn::<Self>::new("Bild", |r| r.fields.image_url.clone()),
            CsvColumn::<Self>::new("Datum", submitted_at),
        ]
    }
}

impl CsvExport for ContactMessage {
    fn csv_columns() -> Vec<CsvColumn<Self>> {
        vec![
            CsvColumn::<Self>::new("Name", |r| r.fields.name.clone()),
            CsvColumn::<Self>::new("E-Mail", |r| r.fields.email.clone()),
            CsvColumn::<Self>::new("Betreff", |r| r.fields.subject.clone()),
            CsvColumn::<Self>::new("Nachricht", |r| r.fields.message.clone()),
            CsvColumn::<Self>::new("Datum", submitted_at),
        ]
    }
}

impl CsvExport for ArchivePhoto {
    fn csv_columns() -> Vec<CsvColumn<Self>> {
        vec![
            CsvColumn::<Self>::new("Kategorie", |r| r.fields.category.clone()),
            CsvColumn::<Self>::new("Bild", |r| r.fields.image_url.clone()),
            CsvColumn::<Self>::new("Beschreibung", |r| optional(&r.fields.caption)),
            CsvColumn::<Self>::new("Gast", |r| optional(&r.fields.guest_name)),
            CsvColumn::<Self>::new("Datum", submitted_at),
        ]
    }
}

use std::sync::Arc;

use shared::{
    domain::{ArchivePhoto, ContactMessage, GuestPhoto, GuestbookEntry, MusicWish, RsvpResponse},
    error::GuestDataError,
    protocol::{ListQuery, Stored, ARCHIVE_PAGE_SIZE},
    validation::{Entity, ValidationRules},
};
use tracing::{info, warn};

pub mod aggregate;
pub mod config;
pub mod gallery;
pub mod media;
pub mod store;
pub mod upload;

pub use config::{load_settings, Settings};
pub use store::{DemoRecordStore, LiveRecordStore, RecordStore, Records, StoreMode};

use aggregate::{summarize, DashboardSummary};
use media::MediaHost;
use upload::{UploadCoordinator, UploadPolicy};

const RECENT_PHOTO_LIMIT: u32 = 12;

/// Entry point to the guest-data services. Construct one per process and
/// hand clones to whatever needs record access.
#[derive(Clone)]
pub struct GuestData {
    store: Arc<dyn RecordStore>,
    rules: Arc<ValidationRules>,
}

impl GuestData {
    pub fn new(store: Arc<dyn RecordStore>, rules: ValidationRules) -> Self {
        Self {
            store,
            rules: Arc::new(rules),
        }
    }

    /// Picks the live or demo store once, based on whether backend
    /// credentials are configured.
    pub fn from_settings(settings: &Settings) -> Result<Self, GuestDataError> {
        let store: Arc<dyn RecordStore> = match settings.backend() {
            Some(backend) => {
                info!(backend_url = %backend.url, "using hosted record backend");
                Arc::new(LiveRecordStore::new(backend)?)
            }
            None => {
                warn!("backend not configured - running in demo mode, submissions are simulated");
                Arc::new(DemoRecordStore)
            }
        };
        Ok(Self::new(store, settings.validation_rules()))
    }

    pub fn mode(&self) -> StoreMode {
        self.store.mode()
    }

    pub fn records<E: Entity>(&self) -> Records<E> {
        Records::new(self.store.clone(), self.rules.clone())
    }

    pub fn rsvps(&self) -> Records<RsvpResponse> {
        self.records()
    }

    pub fn guestbook(&self) -> Records<GuestbookEntry> {
        self.records()
    }

    pub fn music_wishes(&self) -> Records<MusicWish> {
        self.records()
    }

    pub fn guest_photos(&self) -> Records<GuestPhoto> {
        self.records()
    }

    pub fn contact_messages(&self) -> Records<ContactMessage> {
        self.records()
    }

    pub fn archive_photos(&self) -> Records<ArchivePhoto> {
        self.records()
    }

    /// Guestbook entries visible on the public page.
    pub async fn approved_guestbook(&self) -> Result<Vec<Stored<GuestbookEntry>>, GuestDataError> {
        self.guestbook()
            .list(ListQuery::newest_first().eq("approved", true))
            .await
    }

    pub async fn recent_guest_photos(&self) -> Result<Vec<Stored<GuestPhoto>>, GuestDataError> {
        self.guest_photos()
            .list(ListQuery::newest_first().limit(RECENT_PHOTO_LIMIT))
            .await
    }

    pub async fn archive_page(
        &self,
        category: Option<&str>,
        offset: u32,
    ) -> Result<Vec<Stored<ArchivePhoto>>, GuestDataError> {
        self.archive_photos()
            .list(ListQuery::archive_page(category, ARCHIVE_PAGE_SIZE, offset))
            .await
    }

    /// Loads every admin-visible table concurrently and derives the dashboard
    /// figures.
    pub async fn dashboard(&self) -> Result<DashboardSummary, GuestDataError> {
        let (rsvp_records, guestbook_records, photo_records, wish_records, contact_records) = (
            self.rsvps(),
            self.guestbook(),
            self.guest_photos(),
            self.music_wishes(),
            self.contact_messages(),
        );
        let (rsvps, guestbook, photos, wishes, contacts) = futures::try_join!(
            rsvp_records.list_all(),
            guestbook_records.list_all(),
            photo_records.list_all(),
            wish_records.list_all(),
            contact_records.list_all(),
        )?;
        Ok(summarize(&rsvps, &guestbook, &photos, &wishes, &contacts))
    }

    pub fn upload_coordinator(
        &self,
        media: Arc<dyn MediaHost>,
        policy: UploadPolicy,
    ) -> UploadCoordinator {
        UploadCoordinator::new(media, self.guest_photos(), policy)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

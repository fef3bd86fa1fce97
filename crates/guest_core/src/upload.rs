use std::{sync::Arc, time::Duration};

use shared::{
    domain::{EntityKind, GuestPhoto},
    error::{ErrorCode, FieldIssue, FieldProblem, GuestDataError, ValidationError},
    protocol::Stored,
};
use thiserror::Error;
use tokio::time::{interval_at, Instant};
use tracing::{error, info, warn};

use crate::{
    media::{MediaHost, UploadFile, UploadedMedia},
    store::Records,
};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);
const PROGRESS_STEP: u8 = 10;
/// Ceiling for the estimate while the upload itself is in flight.
const UPLOAD_PROGRESS_CAP: u8 = 90;
const UPLOADED_PROGRESS: u8 = 95;
const DONE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            max_files: 10,
        }
    }
}

impl UploadPolicy {
    pub fn check(&self, file: &UploadFile) -> Result<(), FileRejection> {
        if !file.mime_type.starts_with("image/") {
            return Err(FileRejection::NotAnImage {
                mime_type: file.mime_type.clone(),
            });
        }
        if file.size() > self.max_bytes {
            return Err(FileRejection::TooLarge {
                size: file.size(),
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileRejection {
    #[error("{mime_type} is not an image")]
    NotAnImage { mime_type: String },
    #[error("file has {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("batch is limited to {limit} files")]
    BatchFull { limit: usize },
}

#[derive(Debug)]
pub enum FileFailure {
    Rejected(FileRejection),
    Upload(GuestDataError),
    /// The media asset exists but its photo record could not be written.
    Record {
        media: UploadedMedia,
        error: GuestDataError,
    },
}

impl FileFailure {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected(_) => ErrorCode::Validation,
            Self::Upload(err) | Self::Record { error: err, .. } => err.code(),
        }
    }
}

#[derive(Debug)]
pub struct FileOutcome {
    /// Position of the file in the submitted batch.
    pub index: usize,
    pub filename: String,
    pub result: Result<Stored<GuestPhoto>, FileFailure>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn uploaded(&self) -> impl Iterator<Item = &Stored<GuestPhoto>> + '_ {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> + '_ {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Receives per-file progress percentages. Values only ever increase for a
/// given file and reach 100 once its photo record is written.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, index: usize, percent: u8);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, u8) + Send + Sync,
{
    fn on_progress(&self, index: usize, percent: u8) {
        self(index, percent)
    }
}

struct FileProgress<'a> {
    index: usize,
    last: Option<u8>,
    observer: &'a dyn ProgressObserver,
}

impl FileProgress<'_> {
    fn report(&mut self, percent: u8) {
        if self.last.map_or(true, |last| percent > last) {
            self.last = Some(percent);
            self.observer.on_progress(self.index, percent);
        }
    }

    fn bump(&mut self) {
        let next = self
            .last
            .unwrap_or(0)
            .saturating_add(PROGRESS_STEP)
            .min(UPLOAD_PROGRESS_CAP);
        self.report(next);
    }
}

/// Uploads guest photos one after another and records each successful upload
/// as a [`GuestPhoto`].
pub struct UploadCoordinator {
    media: Arc<dyn MediaHost>,
    photos: Records<GuestPhoto>,
    policy: UploadPolicy,
    tick: Duration,
}

impl UploadCoordinator {
    pub fn new(media: Arc<dyn MediaHost>, photos: Records<GuestPhoto>, policy: UploadPolicy) -> Self {
        Self {
            media,
            photos,
            policy,
            tick: PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn policy(&self) -> UploadPolicy {
        self.policy
    }

    /// Processes `files` strictly in order. A file that fails validation,
    /// upload or record write is reported in its slot; the rest of the batch
    /// carries on. Only a missing guest name or an empty batch fails the whole
    /// call.
    pub async fn upload_batch(
        &self,
        guest_name: &str,
        files: Vec<UploadFile>,
        progress: &dyn ProgressObserver,
    ) -> Result<BatchReport, GuestDataError> {
        let mut issues = Vec::new();
        if guest_name.trim().is_empty() {
            issues.push(FieldIssue {
                field: "guest_name",
                problem: FieldProblem::Missing,
            });
        }
        if files.is_empty() {
            issues.push(FieldIssue {
                field: "files",
                problem: FieldProblem::Missing,
            });
        }
        if !issues.is_empty() {
            return Err(ValidationError {
                kind: EntityKind::GuestPhoto,
                issues,
            }
            .into());
        }

        let mut report = BatchReport::default();
        let mut accepted = 0;
        for (index, file) in files.into_iter().enumerate() {
            let admitted = self.policy.check(&file).and_then(|()| {
                if accepted >= self.policy.max_files {
                    Err(FileRejection::BatchFull {
                        limit: self.policy.max_files,
                    })
                } else {
                    Ok(())
                }
            });

            let result = match admitted {
                Ok(()) => {
                    accepted += 1;
                    self.process(index, guest_name, &file, progress).await
                }
                Err(rejection) => {
                    warn!(index, filename = %file.filename, %rejection, "skipping file");
                    Err(FileFailure::Rejected(rejection))
                }
            };
            report.outcomes.push(FileOutcome {
                index,
                filename: file.filename,
                result,
            });
        }

        info!(
            total = report.outcomes.len(),
            uploaded = report.uploaded().count(),
            "photo batch finished"
        );
        Ok(report)
    }

    async fn process(
        &self,
        index: usize,
        guest_name: &str,
        file: &UploadFile,
        observer: &dyn ProgressObserver,
    ) -> Result<Stored<GuestPhoto>, FileFailure> {
        let mut progress = FileProgress {
            index,
            last: None,
            observer,
        };
        progress.report(0);

        // The media host reports no progress of its own, so estimate it.
        let upload = self.media.upload(file);
        tokio::pin!(upload);
        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        let uploaded = loop {
            tokio::select! {
                result = &mut upload => break result,
                _ = ticker.tick() => progress.bump(),
            }
        };

        let media = uploaded.map_err(|err| {
            warn!(index, filename = %file.filename, error = %err, "photo upload failed");
            FileFailure::Upload(err)
        })?;
        progress.report(UPLOADED_PROGRESS);

        let record = GuestPhoto {
            guest_name: guest_name.trim().to_string(),
            image_url: media.url.clone(),
        };
        match self.photos.submit(record).await {
            Ok(stored) => {
                progress.report(DONE);
                Ok(stored)
            }
            Err(err) => {
                error!(
                    index,
                    filename = %file.filename,
                    image_url = %media.url,
                    error = %err,
                    "photo uploaded but record write failed"
                );
                Err(FileFailure::Record { media, error: err })
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;

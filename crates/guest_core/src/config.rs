use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::validation::ValidationRules;
use tracing::warn;
use url::Url;

use crate::{gallery::PageConfig, upload::UploadPolicy};

pub const DEFAULT_CONFIG_FILE: &str = "guest.toml";
pub const DEFAULT_MEDIA_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub media_cloud_name: Option<String>,
    pub media_upload_preset: Option<String>,
    pub media_folder: String,
    pub media_api_base: String,
    pub max_upload_bytes: u64,
    pub max_files_per_batch: usize,
    pub archive_categories: Vec<String>,
    pub gallery_page_size: usize,
    pub gallery_page_increment: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: None,
            backend_key: None,
            media_cloud_name: None,
            media_upload_preset: None,
            media_folder: "wedding-photos".into(),
            media_api_base: DEFAULT_MEDIA_API_BASE.into(),
            max_upload_bytes: 10 * 1024 * 1024,
            max_files_per_batch: 10,
            archive_categories: ["ceremony", "reception", "party", "portraits"]
                .into_iter()
                .map(String::from)
                .collect(),
            gallery_page_size: 12,
            gallery_page_increment: 12,
        }
    }
}

/// Credentials for the hosted record backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub url: Url,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSettings {
    pub api_base: String,
    pub cloud_name: String,
    pub upload_preset: String,
    pub folder: String,
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    backend_url: Option<String>,
    backend_key: Option<String>,
    media_cloud_name: Option<String>,
    media_upload_preset: Option<String>,
    media_folder: Option<String>,
    media_api_base: Option<String>,
    max_upload_bytes: Option<u64>,
    max_files_per_batch: Option<usize>,
    archive_categories: Option<Vec<String>>,
    gallery_page_size: Option<usize>,
    gallery_page_increment: Option<usize>,
}

impl Settings {
    /// Backend credentials, or `None` when the process should run in demo
    /// mode.
    pub fn backend(&self) -> Option<BackendSettings> {
        let raw_url = non_blank(self.backend_url.as_deref())?;
        let key = non_blank(self.backend_key.as_deref())?;
        match Url::parse(raw_url) {
            Ok(url) => Some(BackendSettings {
                url,
                key: key.to_string(),
            }),
            Err(err) => {
                warn!(backend_url = raw_url, error = %err, "ignoring unparseable backend url");
                None
            }
        }
    }

    pub fn media(&self) -> Option<MediaSettings> {
        let cloud_name = non_blank(self.media_cloud_name.as_deref())?;
        let upload_preset = non_blank(self.media_upload_preset.as_deref())?;
        Some(MediaSettings {
            api_base: self.media_api_base.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.to_string(),
            upload_preset: upload_preset.to_string(),
            folder: self.media_folder.clone(),
        })
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            archive_categories: self.archive_categories.clone(),
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_bytes: self.max_upload_bytes,
            max_files: self.max_files_per_batch,
        }
    }

    pub fn gallery_pages(&self) -> PageConfig {
        PageConfig::new(self.gallery_page_size, self.gallery_page_increment)
    }

    fn apply_file(&mut self, file_cfg: FileSettings) {
        if file_cfg.backend_url.is_some() {
            self.backend_url = file_cfg.backend_url;
        }
        if file_cfg.backend_key.is_some() {
            self.backend_key = file_cfg.backend_key;
        }
        if file_cfg.media_cloud_name.is_some() {
            self.media_cloud_name = file_cfg.media_cloud_name;
        }
        if file_cfg.media_upload_preset.is_some() {
            self.media_upload_preset = file_cfg.media_upload_preset;
        }
        if let Some(v) = file_cfg.media_folder {
            self.media_folder = v;
        }
        if let Some(v) = file_cfg.media_api_base {
            self.media_api_base = v;
        }
        if let Some(v) = file_cfg.max_upload_bytes {
            self.max_upload_bytes = v;
        }
        if let Some(v) = file_cfg.max_files_per_batch {
            self.max_files_per_batch = v;
        }
        if let Some(v) = file_cfg.archive_categories {
            self.archive_categories = v;
        }
        if let Some(v) = file_cfg.gallery_page_size {
            self.gallery_page_size = v;
        }
        if let Some(v) = file_cfg.gallery_page_increment {
            self.gallery_page_increment = v;
        }
    }

    /// Applies environment overrides. Later names in each list win.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .filter(|v| !v.trim().is_empty())
                .last()
        };

        if let Some(v) = pick(&["SUPABASE_URL", "APP__BACKEND_URL"]) {
            self.backend_url = Some(v);
        }
        if let Some(v) = pick(&["SUPABASE_ANON_KEY", "APP__BACKEND_KEY"]) {
            self.backend_key = Some(v);
        }
        if let Some(v) = pick(&["CLOUDINARY_CLOUD_NAME", "APP__MEDIA_CLOUD_NAME"]) {
            self.media_cloud_name = Some(v);
        }
        if let Some(v) = pick(&["CLOUDINARY_UPLOAD_PRESET", "APP__MEDIA_UPLOAD_PRESET"]) {
            self.media_upload_preset = Some(v);
        }
        if let Some(v) = pick(&["APP__MEDIA_FOLDER"]) {
            self.media_folder = v;
        }
        if let Some(v) = pick(&["APP__MEDIA_API_BASE"]) {
            self.media_api_base = v;
        }
        if let Some(v) = pick(&["APP__MAX_UPLOAD_BYTES"]) {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                self.max_upload_bytes = parsed;
            }
        }
        if let Some(v) = pick(&["APP__ARCHIVE_CATEGORIES"]) {
            self.archive_categories = v
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Reads settings from `path` (or `guest.toml` in the working directory when
/// no path is given) and then the process environment. A missing default file
/// is not an error; a missing explicit file is.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
            settings.apply_file(file_cfg);
        }
        Err(err) if explicit => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => {}
    }

    settings.apply_env_with(|name| std::env::var(name).ok());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_run_in_demo_mode() {
        let settings = Settings::default();
        assert!(settings.backend().is_none());
        assert!(settings.media().is_none());
        assert_eq!(settings.upload_policy().max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn backend_requires_both_url_and_key() {
        let mut settings = Settings::default();
        settings.apply_env_with(env(&[("SUPABASE_URL", "https://wedding.supabase.co")]));
        assert!(settings.backend().is_none());

        settings.apply_env_with(env(&[("SUPABASE_ANON_KEY", "anon")]));
        let backend = settings.backend().expect("backend configured");
        assert_eq!(backend.url.as_str(), "https://wedding.supabase.co/");
        assert_eq!(backend.key, "anon");
    }

    #[test]
    fn blank_and_unparseable_values_are_ignored() {
        let mut settings = Settings::default();
        settings.apply_env_with(env(&[
            ("SUPABASE_URL", "not a url"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("CLOUDINARY_CLOUD_NAME", "   "),
            ("APP__MAX_UPLOAD_BYTES", "lots"),
        ]));
        assert!(settings.backend().is_none());
        assert!(settings.media_cloud_name.is_none());
        assert_eq!(settings.max_upload_bytes, Settings::default().max_upload_bytes);
    }

    #[test]
    fn app_prefixed_names_override_vendor_names() {
        let mut settings = Settings::default();
        settings.apply_env_with(env(&[
            ("CLOUDINARY_CLOUD_NAME", "vendor"),
            ("APP__MEDIA_CLOUD_NAME", "app"),
            ("CLOUDINARY_UPLOAD_PRESET", "guests"),
            ("APP__ARCHIVE_CATEGORIES", "ceremony, dinner,,"),
        ]));
        let media = settings.media().expect("media configured");
        assert_eq!(media.cloud_name, "app");
        assert_eq!(media.folder, "wedding-photos");
        assert_eq!(settings.archive_categories, vec!["ceremony", "dinner"]);
    }

    #[test]
    fn reads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
backend_url = "https://wedding.supabase.co"
backend_key = "anon"
max_files_per_batch = 4
archive_categories = ["ceremony"]
gallery_page_size = 6
"#
        )
        .expect("write config");

        let mut settings = Settings::default();
        let raw = fs::read_to_string(file.path()).expect("read back");
        settings.apply_file(toml::from_str(&raw).expect("parse"));
        assert!(settings.backend().is_some());
        assert_eq!(settings.max_files_per_batch, 4);
        assert_eq!(settings.archive_categories, vec!["ceremony"]);
        assert_eq!(settings.gallery_pages().initial, 6);
        assert_eq!(settings.gallery_pages().increment, 12);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        assert!(load_settings(Some(&missing)).is_err());
    }
}

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use guest_core::{
    aggregate::{export_filename, search, to_csv, CsvExport, Searchable},
    load_settings,
    media::{CloudinaryHost, MediaHost, MissingMediaHost, UploadFile},
    upload::FileFailure,
    GuestData,
};
use shared::{
    domain::{
        ArchivePhoto, Attendance, ContactMessage, EntityKind, GuestPhoto, GuestbookEntry,
        MusicWish, RsvpResponse,
    },
    error::FormNotice,
    validation::Entity,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "guest-tools", about = "Guest data administration")]
struct Cli {
    /// Settings file; defaults to ./guest.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print dashboard figures.
    Stats,
    /// Write one table to a semicolon-separated CSV file.
    Export {
        entity: EntityKind,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Only export records whose name or email contains this text.
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Submit an RSVP.
    Rsvp {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        attending: Option<Attendance>,
        #[arg(long, default_value_t = 1)]
        guests: u32,
        #[arg(long, default_value = "Klassisch")]
        menu: String,
        #[arg(long)]
        allergies: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
    /// Upload photos on behalf of a guest.
    Upload {
        #[arg(long)]
        guest_name: String,
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;
    let data = GuestData::from_settings(&settings)?;

    match cli.command {
        Command::Stats => {
            let summary = data.dashboard().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Export {
            entity,
            out_dir,
            search,
        } => {
            let path = match entity {
                EntityKind::Rsvp => export::<RsvpResponse>(&data, &out_dir, &search).await?,
                EntityKind::GuestbookEntry => {
                    export::<GuestbookEntry>(&data, &out_dir, &search).await?
                }
                EntityKind::MusicWish => export::<MusicWish>(&data, &out_dir, &search).await?,
                EntityKind::GuestPhoto => export::<GuestPhoto>(&data, &out_dir, &search).await?,
                EntityKind::ContactMessage => {
                    export::<ContactMessage>(&data, &out_dir, &search).await?
                }
                EntityKind::ArchivePhoto => {
                    export::<ArchivePhoto>(&data, &out_dir, &search).await?
                }
            };
            println!("wrote {}", path.display());
        }
        Command::Rsvp {
            name,
            email,
            attending,
            guests,
            menu,
            allergies,
            message,
        } => {
            let rsvp = RsvpResponse {
                menu_choice: menu,
                allergies,
                message,
                ..RsvpResponse::new(name, email)
                    .attending(attending)
                    .guest_count(guests)
            };
            match data.rsvps().submit(rsvp).await {
                Ok(stored) => {
                    println!("{}", FormNotice::rsvp_confirmation(stored.fields.attending).text);
                    println!("recorded rsvp id={}", stored.id);
                }
                Err(err) => {
                    eprintln!("{}", FormNotice::from_error(&err).text);
                    return Err(err.into());
                }
            }
        }
        Command::Upload { guest_name, files } => {
            let media: Arc<dyn MediaHost> = match settings.media() {
                Some(media) => Arc::new(CloudinaryHost::new(media)),
                None => Arc::new(MissingMediaHost),
            };
            let mut batch = Vec::with_capacity(files.len());
            for path in &files {
                batch.push(read_upload(path).await?);
            }

            let uploads = data.upload_coordinator(media, settings.upload_policy());
            let report = uploads
                .upload_batch(&guest_name, batch, &|index: usize, percent: u8| {
                    info!(index, percent, "upload progress");
                })
                .await?;

            for outcome in &report.outcomes {
                match &outcome.result {
                    Ok(photo) => println!("{}: {}", outcome.filename, photo.fields.image_url),
                    Err(FileFailure::Rejected(reason)) => {
                        println!("{}: skipped ({reason})", outcome.filename)
                    }
                    Err(FileFailure::Upload(err)) => println!("{}: {err}", outcome.filename),
                    Err(FileFailure::Record { media, error }) => println!(
                        "{}: uploaded to {} but not recorded ({error})",
                        outcome.filename, media.url
                    ),
                }
            }
            let notice = if report.all_succeeded() {
                FormNotice::success(EntityKind::GuestPhoto).text
            } else {
                format!("{} of {} photos uploaded", report.uploaded().count(), report.outcomes.len())
            };
            println!("{notice}");
        }
    }

    Ok(())
}

async fn export<E>(data: &GuestData, out_dir: &Path, query: &str) -> Result<PathBuf>
where
    E: Entity + CsvExport + Searchable,
{
    let records = data.records::<E>().list_all().await?;
    let matching = search(&records, query);
    let csv = to_csv(matching, &E::csv_columns());

    let path = out_dir.join(export_filename(E::KIND, chrono::Local::now().date_naive()));
    tokio::fs::write(&path, csv)
        .await
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(path)
}

async fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(UploadFile::new(filename, mime_type, bytes))
}

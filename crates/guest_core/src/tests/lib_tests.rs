use super::*;
use crate::{
    aggregate::{compute_rsvp_stats, RsvpStats},
    media::{MissingMediaHost, UploadFile},
};
use shared::{
    domain::{Attendance, EntityKind},
    error::{ErrorCode, FormNotice},
};

fn demo() -> GuestData {
    GuestData::from_settings(&Settings::default()).expect("demo data")
}

#[tokio::test]
async fn unconfigured_backend_selects_demo_mode() {
    assert_eq!(demo().mode(), StoreMode::Demo);
}

#[tokio::test]
async fn configured_backend_selects_live_mode() {
    let settings = Settings {
        backend_url: Some("https://wedding.supabase.co".into()),
        backend_key: Some("anon".into()),
        ..Settings::default()
    };
    let data = GuestData::from_settings(&settings).expect("live data");
    assert_eq!(data.mode(), StoreMode::Live);
}

#[tokio::test]
async fn rsvp_scenario_stats_from_submitted_records() {
    let rsvps = demo().rsvps();
    let submitted = vec![
        rsvps
            .submit(
                RsvpResponse::new("Anna", "anna@example.com")
                    .attending(Some(Attendance::Yes))
                    .guest_count(2),
            )
            .await
            .expect("anna"),
        rsvps
            .submit(RsvpResponse::new("Ben", "ben@example.com").attending(Some(Attendance::No)))
            .await
            .expect("ben"),
        rsvps
            .submit(RsvpResponse::new("Cara", "cara@example.com").guest_count(1))
            .await
            .expect("cara"),
    ];

    assert_eq!(
        compute_rsvp_stats(&submitted),
        RsvpStats {
            total_responses: 3,
            confirmed_count: 1,
            declined_count: 1,
            pending_count: 1,
            total_guests: 2,
        }
    );
}

#[tokio::test]
async fn demo_dashboard_is_empty() {
    let data = demo();
    data.guestbook()
        .submit(GuestbookEntry::new("Ben", "Alles Gute!"))
        .await
        .expect("entry");

    let summary = data.dashboard().await.expect("dashboard");
    assert_eq!(summary.rsvp, RsvpStats::default());
    assert_eq!(summary.guestbook_entries, 0);
    assert!(data.approved_guestbook().await.expect("list").is_empty());
    assert!(data
        .archive_page(Some("party"), 0)
        .await
        .expect("archive")
        .is_empty());
}

#[tokio::test]
async fn archive_submission_checks_configured_categories() {
    let data = demo();
    let err = data
        .archive_photos()
        .submit(ArchivePhoto {
            image_url: "https://cdn.example.com/1.jpg".into(),
            caption: None,
            category: "afterparty".into(),
            guest_name: None,
        })
        .await
        .expect_err("unknown category");
    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(
        FormNotice::from_error(&err).text,
        "Bitte füllen Sie alle Pflichtfelder aus."
    );
}

#[tokio::test]
async fn contact_submission_in_demo_mode_succeeds() {
    let stored = demo()
        .contact_messages()
        .submit(ContactMessage {
            name: "Dora".into(),
            email: "dora@example.com".into(),
            subject: "Anreise".into(),
            message: "Gibt es Parkplätze?".into(),
        })
        .await
        .expect("contact");
    assert_eq!(stored.fields.subject, "Anreise");
    assert_eq!(
        FormNotice::success(EntityKind::ContactMessage).text,
        "Vielen Dank für Ihre Nachricht! Wir melden uns in Kürze bei Ihnen."
    );
}

#[tokio::test]
async fn uploads_without_media_host_report_each_file() {
    let uploads = demo().upload_coordinator(Arc::new(MissingMediaHost), UploadPolicy::default());
    let report = uploads
        .upload_batch(
            "Eva",
            vec![
                UploadFile::new("a.jpg", "image/jpeg", vec![1]),
                UploadFile::new("b.png", "image/png", vec![2]),
            ],
            &|_: usize, _: u8| {},
        )
        .await
        .expect("batch");
    assert_eq!(report.failed().count(), 2);
    assert!(report
        .failed()
        .all(|o| matches!(&o.result, Err(f) if f.code() == ErrorCode::Upload)));
}

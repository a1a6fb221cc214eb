use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use presentia_core::{AppError, AppResult, OperatorIdentity};
use presentia_domain::{PhotoReference, Role};

use crate::auth_service::Session;
use crate::ports::{
    DocumentRangeStore, Feedback, FeedbackSeverity, FeedbackSink, NamedRange, ObjectStore,
    SnapshotCache,
};
use crate::snapshot::LocalSnapshot;
use crate::state::AppState;

use super::{RegisterStudentInput, RegistrationService};

#[derive(Default)]
struct FakeRemote {
    rows: Mutex<HashMap<NamedRange, Vec<Vec<String>>>>,
    fail_appends: AtomicBool,
}

#[async_trait]
impl DocumentRangeStore for FakeRemote {
    async fn read_range(&self, range: NamedRange) -> AppResult<Vec<Vec<String>>> {
        Ok(self.rows.lock().await.get(&range).cloned().unwrap_or_default())
    }

    async fn append_rows(&self, range: NamedRange, rows: Vec<Vec<String>>) -> AppResult<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("remote store offline".to_owned()));
        }
        self.rows.lock().await.entry(range).or_default().extend(rows);
        Ok(())
    }

    async fn clear_range(&self, range: NamedRange) -> AppResult<()> {
        self.rows.lock().await.remove(&range);
        Ok(())
    }

    async fn overwrite_range(&self, range: NamedRange, rows: Vec<Vec<String>>) -> AppResult<()> {
        self.rows.lock().await.insert(range, rows);
        Ok(())
    }
}

#[derive(Default)]
struct FakeObjectStore {
    uploads: Mutex<Vec<String>>,
    fail: AtomicBool,
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn upload(&self, file_name: &str, _data_url: &str, _mime_type: &str) -> AppResult<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("object store offline".to_owned()));
        }
        self.uploads.lock().await.push(file_name.to_owned());
        Ok(format!("https://objects.example/{file_name}"))
    }
}

#[derive(Default)]
struct FakeSnapshotCache {
    stored: Mutex<Vec<LocalSnapshot>>,
}

#[async_trait]
impl SnapshotCache for FakeSnapshotCache {
    async fn load(&self) -> AppResult<Option<LocalSnapshot>> {
        Ok(self.stored.lock().await.last().cloned())
    }

    async fn store(&self, snapshot: &LocalSnapshot) -> AppResult<()> {
        self.stored.lock().await.push(snapshot.clone());
        Ok(())
    }
}

#[derive(Default)]
struct FakeFeedbackSink {
    notified: std::sync::Mutex<Vec<Feedback>>,
}

impl FeedbackSink for FakeFeedbackSink {
    fn notify(&self, feedback: Feedback) {
        if let Ok(mut notified) = self.notified.lock() {
            notified.push(feedback);
        }
    }
}

struct Harness {
    state: Arc<AppState>,
    remote: Arc<FakeRemote>,
    objects: Arc<FakeObjectStore>,
    feedback: Arc<FakeFeedbackSink>,
    service: RegistrationService,
}

fn harness() -> Harness {
    let state = Arc::new(AppState::new());
    let remote = Arc::new(FakeRemote::default());
    let objects = Arc::new(FakeObjectStore::default());
    let snapshot_cache = Arc::new(FakeSnapshotCache::default());
    let feedback = Arc::new(FakeFeedbackSink::default());
    let service = RegistrationService::new(
        Arc::clone(&state),
        remote.clone(),
        objects.clone(),
        snapshot_cache,
        feedback.clone(),
    );
    Harness {
        state,
        remote,
        objects,
        feedback,
        service,
    }
}

fn registrar_session() -> Session {
    Session::new(
        &OperatorIdentity::new("subject-1", "Registrar", "reg@school.edu"),
        Role::Registrar,
    )
}

fn input(name: &str, document: &str) -> RegisterStudentInput {
    RegisterStudentInput {
        name: name.to_owned(),
        document_number: document.to_owned(),
        course: "3° Secundaria".to_owned(),
        schedule_label: "A".to_owned(),
        ..RegisterStudentInput::default()
    }
}

#[tokio::test]
async fn registration_uploads_images_and_appends_the_roster_row() {
    let harness = harness();
    let mut form = input("Ana Pérez", "1234567");
    form.photo_data_url = Some("data:image/jpeg;base64,abcd".to_owned());
    form.qr_data_url = Some("data:image/png;base64,efgh".to_owned());

    let student = harness
        .service
        .register(&registrar_session(), form, Utc::now())
        .await;
    let student = student.unwrap_or_else(|_| panic!("registration succeeds"));

    assert!(matches!(student.photo(), PhotoReference::Url(_)));
    assert!(student.qr_url().starts_with("https://objects.example/qr_"));
    assert_eq!(student.registered_by(), "subject-1");
    assert_eq!(harness.objects.uploads.lock().await.len(), 2);
    assert_eq!(harness.state.roster().len().await, 1);

    let rows = harness.remote.rows.lock().await;
    assert_eq!(rows.get(&NamedRange::Students).map(Vec::len), Some(1));
}

#[tokio::test]
async fn duplicate_document_number_is_rejected_before_any_upload() {
    let harness = harness();
    let first = harness
        .service
        .register(&registrar_session(), input("Ana Pérez", "1234567"), Utc::now())
        .await;
    assert!(first.is_ok());

    let mut second = input("Luis Mamani", "1234567");
    second.photo_data_url = Some("data:image/jpeg;base64,abcd".to_owned());
    let result = harness
        .service
        .register(&registrar_session(), second, Utc::now())
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(harness.state.roster().len().await, 1);
    // No upload was attempted for the rejected form.
    assert!(harness.objects.uploads.lock().await.is_empty());
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let harness = harness();
    let result = harness
        .service
        .register(&registrar_session(), input("   ", "1234567"), Utc::now())
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(harness.state.roster().is_empty().await);
}

#[tokio::test]
async fn unreachable_object_store_degrades_to_an_inline_photo() {
    let harness = harness();
    harness.objects.fail.store(true, Ordering::SeqCst);

    let mut form = input("Ana Pérez", "1234567");
    form.photo_data_url = Some("data:image/jpeg;base64,abcd".to_owned());
    form.qr_data_url = Some("data:image/png;base64,efgh".to_owned());

    let student = harness
        .service
        .register(&registrar_session(), form, Utc::now())
        .await;
    let student = student.unwrap_or_else(|_| panic!("registration still succeeds"));

    assert_eq!(
        student.photo(),
        &PhotoReference::Inline("data:image/jpeg;base64,abcd".to_owned())
    );
    assert_eq!(student.qr_url(), "");
}

#[tokio::test]
async fn unreachable_remote_store_keeps_the_registration_local() {
    let harness = harness();
    harness.remote.fail_appends.store(true, Ordering::SeqCst);

    let result = harness
        .service
        .register(&registrar_session(), input("Ana Pérez", "1234567"), Utc::now())
        .await;

    assert!(result.is_ok());
    assert_eq!(harness.state.roster().len().await, 1);

    let warned = harness
        .feedback
        .notified
        .lock()
        .map(|notified| {
            notified
                .iter()
                .any(|feedback| feedback.severity == FeedbackSeverity::Warning)
        })
        .unwrap_or(false);
    assert!(warned);
}

#[tokio::test]
async fn scanner_role_may_not_register() {
    let harness = harness();
    let session = Session::new(
        &OperatorIdentity::new("subject-2", "Scanner", "scan@school.edu"),
        Role::Scanner,
    );

    let result = harness
        .service
        .register(&session, input("Ana Pérez", "1234567"), Utc::now())
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert!(harness.state.roster().is_empty().await);
}

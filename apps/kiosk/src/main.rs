//! Presentia kiosk runtime.
//!
//! The scanning-device binary: wires the services against real adapters,
//! establishes an operator session, restores local state, runs the sync
//! polling loop, and consumes decoded QR payloads from stdin. The camera
//! and QR decoder are external collaborators; one line on stdin is one
//! decoded payload.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use presentia_application::{
    AppState, AuthService, BackgroundFlusher, DocumentRangeStore, FeedbackSink, ObjectStore,
    RegisterStudentInput, RegistrationService, ScanOutcome, ScanService, Session, SessionCache,
    SnapshotCache, SyncService,
};
use presentia_core::{AppError, AppResult, OperatorIdentity};
use presentia_domain::{AttendanceMode, Capability};
use presentia_infrastructure::{
    DriveObjectStore, InMemoryDocumentStore, JsonSessionCache, JsonSnapshotCache, SheetsConfig,
    SheetsDocumentStore, StaticIdentityProvider, TokioBackgroundFlusher, TracingFeedbackSink,
};

#[derive(Debug, Clone)]
struct KioskConfig {
    sheets_base_url: String,
    spreadsheet_id: Option<String>,
    access_token: String,
    drive_upload_url: String,
    drive_api_url: String,
    drive_folder_id: Option<String>,
    data_dir: String,
    poll_interval_secs: u64,
    scan_pause_ms: u64,
    operator: OperatorIdentity,
}

impl KioskConfig {
    fn load() -> AppResult<Self> {
        let sheets_base_url = env::var("PRESENTIA_SHEETS_BASE_URL")
            .unwrap_or_else(|_| "https://sheets.googleapis.com/v4/spreadsheets".to_owned())
            .trim_end_matches('/')
            .to_owned();
        let spreadsheet_id = optional_env("PRESENTIA_SHEET_ID");
        let access_token = optional_env("PRESENTIA_API_TOKEN").unwrap_or_default();
        if spreadsheet_id.is_some() && access_token.is_empty() {
            return Err(AppError::Validation(
                "PRESENTIA_API_TOKEN is required when PRESENTIA_SHEET_ID is set"
                    .to_owned(),
            ));
        }

        let drive_upload_url = env::var("PRESENTIA_DRIVE_UPLOAD_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/upload/drive/v3".to_owned())
            .trim_end_matches('/')
            .to_owned();
        let drive_api_url = env::var("PRESENTIA_DRIVE_API_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/drive/v3".to_owned())
            .trim_end_matches('/')
            .to_owned();
        let drive_folder_id = optional_env("PRESENTIA_DRIVE_FOLDER_ID");

        let data_dir = env::var("PRESENTIA_DATA_DIR").unwrap_or_else(|_| "./data".to_owned());
        let poll_interval_secs = parse_env_u64("PRESENTIA_POLL_INTERVAL_SECS", 45)?;
        let scan_pause_ms = parse_env_u64("PRESENTIA_SCAN_PAUSE_MS", 3000)?;
        if poll_interval_secs == 0 {
            return Err(AppError::Validation(
                "PRESENTIA_POLL_INTERVAL_SECS must be greater than zero".to_owned(),
            ));
        }

        let operator = match optional_env("PRESENTIA_OPERATOR_EMAIL") {
            Some(email) => OperatorIdentity::new(
                optional_env("PRESENTIA_OPERATOR_SUBJECT").unwrap_or_else(|| email.clone()),
                optional_env("PRESENTIA_OPERATOR_NAME").unwrap_or_else(|| email.clone()),
                email,
            ),
            None => OperatorIdentity::offline(),
        };

        Ok(Self {
            sheets_base_url,
            spreadsheet_id,
            access_token,
            drive_upload_url,
            drive_api_url,
            drive_folder_id,
            data_dir,
            poll_interval_secs,
            scan_pause_ms,
            operator,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = KioskConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let remote: Arc<dyn DocumentRangeStore> = match &config.spreadsheet_id {
        Some(spreadsheet_id) => Arc::new(SheetsDocumentStore::new(
            http_client.clone(),
            SheetsConfig {
                base_url: config.sheets_base_url.clone(),
                spreadsheet_id: spreadsheet_id.clone(),
                access_token: config.access_token.clone(),
            },
        )),
        None => {
            info!("no spreadsheet configured; running offline against an in-memory store");
            Arc::new(InMemoryDocumentStore::new())
        }
    };
    let objects: Arc<dyn ObjectStore> = Arc::new(DriveObjectStore::new(
        http_client,
        config.drive_upload_url.clone(),
        config.drive_api_url.clone(),
        config.access_token.clone(),
        config.drive_folder_id.clone(),
    ));
    let snapshot_cache: Arc<dyn SnapshotCache> = Arc::new(JsonSnapshotCache::new(format!(
        "{}/snapshot.json",
        config.data_dir
    )));
    let session_cache: Arc<dyn SessionCache> = Arc::new(JsonSessionCache::new(format!(
        "{}/session.json",
        config.data_dir
    )));
    let feedback: Arc<dyn FeedbackSink> = Arc::new(TracingFeedbackSink);

    let state = Arc::new(AppState::new());
    let sync = Arc::new(SyncService::new(
        Arc::clone(&state),
        Arc::clone(&remote),
        Arc::clone(&snapshot_cache),
        Arc::clone(&feedback),
    ));
    let flusher: Arc<dyn BackgroundFlusher> =
        Arc::new(TokioBackgroundFlusher::new(Arc::clone(&sync)));
    let scan = ScanService::new(
        Arc::clone(&state),
        Arc::clone(&snapshot_cache),
        Arc::clone(&feedback),
        Arc::clone(&flusher),
    );
    let auth = AuthService::new(
        Arc::new(StaticIdentityProvider::new(config.operator.clone())),
        Arc::clone(&remote),
        session_cache,
    );
    let registration = RegistrationService::new(
        Arc::clone(&state),
        Arc::clone(&remote),
        objects,
        Arc::clone(&snapshot_cache),
        Arc::clone(&feedback),
    );

    let session = match auth.restore().await? {
        Some(session) => {
            info!(operator = %session.display_name(), "session restored");
            session
        }
        None => {
            let session = auth.login().await?;
            info!(operator = %session.display_name(), role = session.role().as_str(), "signed in");
            session
        }
    };

    if sync.hydrate_from_cache().await? {
        info!(
            students = state.roster().len().await,
            events = state.ledger().len().await,
            "local snapshot restored"
        );
    }

    spawn_poll_loop(Arc::clone(&sync), config.poll_interval_secs);

    info!(
        "kiosk ready; payloads on stdin, commands: /entrada /salida /sync /status /register /logout /quit"
    );
    run_repl(&config, &session, &scan, &sync, &registration, &auth, &state).await;

    Ok(())
}

fn spawn_poll_loop(sync: Arc<SyncService>, poll_interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(poll_interval_secs));
        loop {
            // First tick fires immediately.
            ticker.tick().await;
            match sync.pull_once().await {
                Some(report) if report.degraded() => {
                    warn!("refresh incomplete; unreachable ranges retry next tick");
                }
                Some(report) if report.changed() => {
                    info!("remote changes applied");
                }
                _ => {}
            }
        }
    });
}

async fn run_repl(
    config: &KioskConfig,
    session: &Session,
    scan: &ScanService,
    sync: &SyncService,
    registration: &RegistrationService,
    auth: &AuthService,
    state: &AppState,
) {
    let mut mode = AttendanceMode::Entry;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "stdin closed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" => break,
            "/logout" => {
                if let Err(error) = auth.logout().await {
                    warn!(%error, "logout failed");
                }
                info!("signed out");
                break;
            }
            "/entrada" => {
                mode = AttendanceMode::Entry;
                info!(mode = mode.as_str(), "scan mode set");
            }
            "/salida" => {
                mode = AttendanceMode::Exit;
                info!(mode = mode.as_str(), "scan mode set");
            }
            "/sync" => {
                if sync.pull_once().await.is_none() {
                    info!("a sync cycle is already running");
                }
            }
            "/status" => {
                print_status(session, sync, state).await;
            }
            command if command.starts_with("/register ") => {
                register_from_line(registration, session, &command["/register ".len()..]).await;
            }
            payload => {
                handle_scan(config, session, scan, payload, mode).await;
            }
        }
    }
}

async fn handle_scan(
    config: &KioskConfig,
    session: &Session,
    scan: &ScanService,
    payload: &str,
    mode: AttendanceMode,
) {
    if session.require(Capability::RecordAttendance).is_err() {
        warn!(role = session.role().as_str(), "this role may not record attendance");
        return;
    }

    match scan.process_scan(payload, mode, session.subject()).await {
        ScanOutcome::Recorded(event) => {
            info!(student = event.name(), mode = mode.as_str(), "recorded");
        }
        ScanOutcome::AlreadyRecorded(existing) => {
            info!(
                student = existing.name(),
                at = %existing.time().format("%H:%M:%S"),
                "already recorded today"
            );
        }
        ScanOutcome::NotFound { identifier } => {
            warn!(%identifier, "code does not match any enrolled student");
        }
        ScanOutcome::Busy => {}
    }

    // Camera decoders re-emit the same code while it stays in frame.
    tokio::time::sleep(Duration::from_millis(config.scan_pause_ms)).await;
}

/// Form format: `name; document; course; schedule`.
async fn register_from_line(registration: &RegistrationService, session: &Session, form: &str) {
    let mut fields = form.split(';').map(str::trim);
    let input = RegisterStudentInput {
        name: fields.next().unwrap_or_default().to_owned(),
        document_number: fields.next().unwrap_or_default().to_owned(),
        course: fields.next().unwrap_or_default().to_owned(),
        schedule_label: fields.next().unwrap_or_default().to_owned(),
        ..RegisterStudentInput::default()
    };

    match registration.register(session, input, chrono::Utc::now()).await {
        Ok(student) => {
            info!(id = %student.id(), name = student.name(), "student registered");
        }
        Err(error) => warn!(%error, "registration rejected"),
    }
}

async fn print_status(session: &Session, sync: &SyncService, state: &AppState) {
    if session.require(Capability::ViewReports).is_err() {
        warn!(role = session.role().as_str(), "this role may not view reports");
        return;
    }

    let today = Local::now().date_naive();
    info!(
        status = ?sync.status().await,
        pending = state.outbox().len().await,
        students = state.roster().len().await,
        present = state.ledger().count_distinct_present(today).await,
        exits = state.ledger().count_events(today, AttendanceMode::Exit).await,
        "kiosk status"
    );
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

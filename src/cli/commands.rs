//! Subcommand handlers: history, interactive capture and config actions.

use std::error::Error;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;

use super::args::ConfigAction;
use emotion_journal::camera::{DeviceManager, Facing, LogSink, StillImageCamera};
use emotion_journal::config::{Config, DEFAULT_CONFIG_TOML};
use emotion_journal::detector::{DetectorAdapter, HttpFaceDetector};
use emotion_journal::session::{
    CaptureMode, CaptureSession, CaptureState, Collaborators, SessionError, SessionSnapshot,
};
use emotion_journal::store::{AuthContext, EmotionRecord, JournalClient, StaticAuth, User};

type CliResult = Result<(), Box<dyn Error>>;

/// Process-wide services shared by every session.
pub struct App {
    pub config: Config,
    client: Arc<JournalClient>,
    auth: Arc<StaticAuth>,
    detector: DetectorAdapter,
    devices: DeviceManager,
}

impl App {
    /// Wire up the backend client, detector and camera from configuration.
    /// CLI flags override the matching config values.
    pub fn build(
        mut config: Config,
        user: Option<u64>,
        api_url: Option<String>,
    ) -> Result<Self, Box<dyn Error>> {
        if let Some(url) = api_url {
            config.api.base_url = url;
        }
        if user.is_some() {
            config.user.id = user;
        }

        let client = Arc::new(JournalClient::new(config.api.base_url.clone())?);
        let auth = Arc::new(StaticAuth::new(config.user.id.map(User::new)));
        let detector = HttpFaceDetector::with_models(
            config.detector_url().to_string(),
            config.detector.models.clone(),
        )?;
        let camera = StillImageCamera::new(
            config.camera.user_frame.clone(),
            config.camera.environment_frame.clone(),
        );

        Ok(Self {
            config,
            client,
            auth,
            detector: DetectorAdapter::new(Arc::new(detector)),
            devices: DeviceManager::new(Arc::new(camera), Arc::new(LogSink)),
        })
    }

    pub fn session(&self, mode: CaptureMode, facing: Option<Facing>) -> CaptureSession {
        let collaborators = Collaborators {
            auth: self.auth.clone(),
            history: self.client.clone(),
            enrollment: self.client.clone(),
        };
        CaptureSession::new(
            mode,
            facing.unwrap_or(self.config.camera.facing),
            self.devices.clone(),
            self.detector.clone(),
            collaborators,
        )
    }

    fn current_user(&self) -> Result<User, Box<dyn Error>> {
        self.auth
            .current_user()
            .ok_or_else(|| "No user configured. Pass --user <id> or set [user] id.".into())
    }
}

/// Print the history of the configured user.
pub async fn show_history(app: &App) -> CliResult {
    let user = app.current_user()?;
    let records = app.client.fetch_history(user.id).await?;
    print_history(&records);
    Ok(())
}

fn print_history(records: &[EmotionRecord]) {
    println!();
    println!("Emotion History");
    if records.is_empty() {
        println!("  No emotions recorded yet.");
        return;
    }
    println!("  {:>4}  {:<10}  Timestamp", "#", "Emotion");
    for (index, record) in records.iter().enumerate() {
        println!(
            "  {:>4}  {:<10}  {}",
            index + 1,
            record.emotion,
            record.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

fn print_controls(mode: CaptureMode) {
    println!();
    println!("Controls:");
    println!("  g  start camera");
    println!("  c  capture");
    match mode {
        CaptureMode::Classify => println!("  y  confirm and save"),
        CaptureMode::Enroll => println!("  y  confirm and enroll"),
    }
    println!("  n  cancel");
    println!("  s  stop camera");
    println!("  r  reset after an error");
    println!("  q  quit");
    println!();
}

fn render_update(prev: &SessionSnapshot, next: &SessionSnapshot) {
    if prev.state != next.state || prev.starting != next.starting {
        match next.state {
            CaptureState::Idle if next.starting => println!("Starting camera..."),
            CaptureState::Idle if prev.state == CaptureState::Saving => {
                println!("Emotion saved.")
            }
            CaptureState::Idle => println!("Camera stopped. Press 'g' to start again."),
            CaptureState::Streaming => println!("Camera ready. Press 'c' to capture."),
            CaptureState::Detecting => println!("Detecting..."),
            CaptureState::AwaitingConfirmation => {
                if let Some(result) = next.last_result {
                    println!(
                        "Detected emotion: {}. Press 'y' to confirm or 'n' to cancel.",
                        result
                    );
                }
            }
            CaptureState::Saving => println!("Saving..."),
            CaptureState::Completed => println!("Face enrolled successfully!"),
            CaptureState::Error => println!("Press 'r' to reset."),
        }
    }
    if prev.error_message != next.error_message {
        if let Some(message) = &next.error_message {
            println!("! {}", message);
        }
    }
    if prev.history != next.history {
        print_history(&next.history);
    }
}

fn spawn_event<F, Fut>(session: &Arc<CaptureSession>, event: F)
where
    F: FnOnce(Arc<CaptureSession>) -> Fut,
    Fut: Future<Output = Result<CaptureState, SessionError>> + Send + 'static,
{
    let fut = event(Arc::clone(session));
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            println!("! {}", e);
        }
    });
}

/// Drive a capture session from stdin until the user quits.
///
/// Ctrl-C stops the camera before exiting. Enrollment sessions end on
/// their own once the sample is accepted.
pub async fn run_capture(session: Arc<CaptureSession>) -> CliResult {
    let (interrupt_tx, mut interrupt_rx) = tokio::sync::mpsc::channel::<()>(1);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    }) {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }

    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = updates.borrow_and_update().clone();
        while updates.changed().await.is_ok() {
            let next = updates.borrow_and_update().clone();
            render_update(&last, &next);
            last = next;
        }
    });

    if session.mode() == CaptureMode::Classify {
        if let Err(e) = session.refresh_history().await {
            log::warn!("History not loaded: {}", e);
        }
    }

    print_controls(session.mode());
    if let Err(e) = session.start().await {
        println!("! {}", e);
    }

    let mut completed = session.subscribe();
    let enrolling = session.mode() == CaptureMode::Enroll;
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    let outcome: CliResult = loop {
        tokio::select! {
            _ = interrupt_rx.recv() => {
                println!();
                break Ok(());
            }
            _ = completed.wait_for(|s| s.state == CaptureState::Completed), if enrolling => {
                break Ok(());
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e.into()),
                };
                match line.trim() {
                    "" => {}
                    "g" => spawn_event(&session, |s| async move { s.start().await }),
                    "c" => spawn_event(&session, |s| async move { s.capture().await }),
                    "y" => spawn_event(&session, |s| async move { s.confirm().await }),
                    "n" => {
                        if let Err(e) = session.cancel() {
                            println!("! {}", e);
                        }
                    }
                    "s" => {
                        session.stop();
                    }
                    "r" => {
                        if let Err(e) = session.reset() {
                            println!("! {}", e);
                        }
                    }
                    "q" => break Ok(()),
                    "h" | "?" => print_controls(session.mode()),
                    other => println!("Unknown command '{}'. Press 'h' for help.", other),
                }
            }
        }
    };

    session.stop();
    printer.abort();
    outcome
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config: &Config, config_path: &Path) {
    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            println!("  API: {}", config.api.base_url);
            println!("  Detector: {}", config.detector_url());
            println!("  Models: {}", config.detector.models.join(", "));
            println!("  Facing: {}", config.camera.facing);
            println!(
                "  Front frame: {}",
                config
                    .camera
                    .user_frame
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!(
                "  Rear frame: {}",
                config
                    .camera
                    .environment_frame
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!(
                "  User: {}",
                config
                    .user
                    .id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "(not signed in)".to_string())
            );
            println!("  Log level: {}", config.logging.level);
            println!();

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'emotion-journal config show' to view current settings.");
                std::process::exit(1);
            }

            if let Some(parent) = config_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Error creating config directory: {}", e);
                    std::process::exit(1);
                }
            }

            if let Err(e) = std::fs::write(config_path, DEFAULT_CONFIG_TOML) {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }

            println!("Created config file: {}", config_path.display());
        }
    }
}

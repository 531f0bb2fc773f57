mod cli;

use std::sync::Arc;

use clap::Parser;
use cli::{handle_config_action, run_capture, show_history, App, Args, Command};
use emotion_journal::config::{default_path, Config};
use emotion_journal::logging;
use emotion_journal::session::CaptureMode;

#[tokio::main]
async fn main() {
    // Optional .env with EMOTION_JOURNAL_TOKEN and RUST_LOG
    dotenv::dotenv().ok();

    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&config.logging.level);

    if let Command::Config { action } = &args.command {
        let path = args.config.clone().unwrap_or_else(default_path);
        handle_config_action(action.clone(), &config, &path);
        return;
    }

    let app = match App::build(config, args.user, args.api_url) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Command::History => show_history(&app).await,
        Command::Capture { facing } => {
            let session = app.session(CaptureMode::Classify, facing.map(Into::into));
            run_capture(Arc::new(session)).await
        }
        Command::Enroll { facing } => {
            let session = app.session(CaptureMode::Enroll, facing.map(Into::into));
            run_capture(Arc::new(session)).await
        }
        Command::Config { .. } => Ok(()),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

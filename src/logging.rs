//! Logger setup for the `log` facade.

use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the global `env_logger` once.
///
/// `RUST_LOG` wins over `default_level`. Later calls do nothing.
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
        builder.format(|buf, record| {
            let ts = chrono::Local::now().format("%H:%M:%S%.3f");
            writeln!(
                buf,
                "{} {:<5} {} {}",
                ts,
                record.level(),
                record.target(),
                record.args()
            )
        });
        builder.target(env_logger::Target::Stderr);
        if let Err(e) = builder.try_init() {
            eprintln!("Logger already installed: {}", e);
        }
    });
}

use std::fs::File;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber once. With `log_file` set, output goes there
/// instead of stderr so it does not tear the terminal display.
pub fn init(log_file: Option<&Path>) {
    TELEMETRY_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("milky_viz=info"))
            .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));

        let builder = fmt().with_env_filter(env_filter).with_target(false).compact();

        let file = log_file.and_then(|path| match File::create(path) {
            Ok(f) => Some(f),
            Err(err) => {
                eprintln!("[telemetry] cannot open {}: {err}", path.display());
                None
            }
        });

        let result = match file {
            Some(f) => builder.with_ansi(false).with_writer(Mutex::new(f)).try_init(),
            None => builder.with_writer(std::io::stderr).try_init(),
        };
        if let Err(err) = result {
            eprintln!("[telemetry] failed to initialise tracing subscriber: {err}");
        }
    });
}

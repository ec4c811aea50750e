use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::{fmt, EnvFilter};

static LOG_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

pub const LOG_FILE: &str = "carryon.log";
const FILTER_ENV: &str = "CARRYON_LOG";
const JSON_ENV: &str = "CARRYON_LOG_JSON";

const HEADER_LINE: &str = "-------------------------------------------------------------------------------";
const HEADER_TITLE: &str = "CarryOn - Carry Interaction Server";

pub fn init(root: &Path) -> Result<(), String> {
    if LOG_PATH.get().is_some() {
        return Ok(());
    }
    let log_dir = root.join("log");
    std::fs::create_dir_all(&log_dir)
        .map_err(|err| format!("log directory create failed: {}", err))?;
    let path = log_dir.join(LOG_FILE);
    let file = open_log(&path)?;

    let filter = EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var(JSON_ENV)
        .map(|value| value == "1")
        .unwrap_or(false);
    let writer = Mutex::new(file);
    let installed = if use_json {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .json()
            .with_writer(writer)
            .try_init()
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(writer)
            .try_init()
    };
    // An embedding host may own the global subscriber already.
    let sink = match installed {
        Ok(()) => Some(path),
        Err(err) => {
            tracing::warn!(error = %err, log = %path.display(), "keeping existing subscriber");
            None
        }
    };
    let _ = LOG_PATH.set(sink);
    Ok(())
}

/// Path of the log file events go to. `None` before `init`, or when another
/// subscriber was already installed.
pub fn log_path() -> Option<&'static Path> {
    LOG_PATH.get().and_then(|path| path.as_deref())
}

fn open_log(path: &Path) -> Result<File, String> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| format!("open log {} failed: {}", path.display(), err))?;
    if file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
        write_header(&mut file)?;
    }
    Ok(file)
}

fn write_header(file: &mut File) -> Result<(), String> {
    let started = unix_timestamp();
    writeln!(file, "{HEADER_LINE}\n{HEADER_TITLE}\n{LOG_FILE} - started {started}")
        .map_err(|err| format!("header write failed: {}", err))
}

fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Name of the run log below the experiment's `log/` directory.
pub const RUN_LOG: &str = "compute_topologyzoo_treewidths.log";

/// Writes every log line to stderr and, if it could be opened, the run log.
struct Tee {
    file: Option<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = &mut self.file {
            if file.write_all(buf).is_err() {
                self.file = None;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = &mut self.file {
            file.flush()?;
        }
        io::stderr().flush()
    }
}

fn builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {} - {}",
                buf.timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter(None, level);
    // RUST_LOG wins over the default level
    builder.parse_env("RUST_LOG");
    builder
}

/// Logs to stderr and to `<log_dir>/compute_topologyzoo_treewidths.log`.
///
/// The run log is truncated. If it cannot be opened a warning is logged and
/// logging continues on stderr alone.
pub fn build_run_logger(log_dir: &Path, level: LevelFilter) {
    let path = log_dir.join(RUN_LOG);
    let opened = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);
    let (file, failure) = match opened {
        Ok(file) => (Some(file), None),
        Err(e) => (None, Some(e)),
    };
    let _ = builder(level)
        .target(Target::Pipe(Box::new(Tee { file })))
        .try_init();
    match failure {
        None => log::info!("logging to {}", path.display()),
        Some(e) => log::warn!("cannot open run log {}: {}", path.display(), e),
    }
}

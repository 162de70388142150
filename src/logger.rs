use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

/// `log` backend for raw terminal mode: `\r\n` line endings, written to a
/// file when one is configured, otherwise to stderr.
pub struct RawModeLogger {
    file: Option<Mutex<File>>,
}

impl RawModeLogger {
    /// Install as the global logger. A second call is ignored.
    pub fn install(file: Option<&Path>, level: log::LevelFilter) -> anyhow::Result<()> {
        let file = match file {
            Some(path) => Some(Mutex::new(
                File::options().create(true).append(true).open(path)?,
            )),
            None => None,
        };
        let logger: &'static RawModeLogger = Box::leak(Box::new(RawModeLogger { file }));
        if log::set_logger(logger).is_ok() {
            log::set_max_level(level);
        }
        Ok(())
    }
}

impl log::Log for RawModeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(SystemTime::now(), record.level(), record.args());
        match &self.file {
            Some(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = f.write_all(line.as_bytes());
                }
            }
            None => {
                let _ = std::io::stderr().write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        match &self.file {
            Some(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = f.flush();
                }
            }
            None => {
                let _ = std::io::stderr().flush();
            }
        }
    }
}

fn format_line(now: SystemTime, level: log::Level, args: &std::fmt::Arguments) -> String {
    let now = now
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs() % 86400; // time of day
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    let ms = now.subsec_millis();
    format!("[{h:02}:{m:02}:{s:02}.{ms:03} {level}] {args}\r\n")
}

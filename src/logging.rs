use ansi_term::Color::{Blue, Cyan, Green, Red, Yellow};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Console logger printing the thread name next to every record,
/// so passengers and trains can be told apart.
struct StationLogger;

fn format_now() -> Option<String> {
    let now = time_format::now().ok()?;
    time_format::strftime_utc("%Y-%m-%d %H:%M:%S", now).ok()
}

fn colored_level(level: Level) -> ansi_term::Colour {
    match level {
        Level::Error => Red,
        Level::Warn => Yellow,
        Level::Info => Green,
        Level::Debug => Blue,
        Level::Trace => Cyan,
    }
}

impl Log for StationLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let formatted_date = format_now().unwrap_or("unknown".to_string());

            println!(
                "[{}][{:>14}][{:>14}]: {} [{}:{}]",
                Cyan.paint(formatted_date),
                Yellow
                    .paint(std::thread::current().name().unwrap_or("main"))
                    .to_string(),
                colored_level(record.level())
                    .paint(record.level().to_string())
                    .to_string(),
                record.args(),
                Green.paint(record.file().unwrap_or("unknown")),
                Green.paint(record.line().unwrap_or(0).to_string())
            );
        }
    }

    fn flush(&self) {}
}

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    static LOGGER: StationLogger = StationLogger;
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

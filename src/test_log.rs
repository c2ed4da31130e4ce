//! Log capture for unit tests
//!
//! Records are kept per thread, so tests running in parallel only see what
//! they logged themselves.

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct CaptureLogger;

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|r| {
            r.borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Run `f` and return what it logged on this thread
pub fn capture<F: FnOnce()>(f: F) -> Vec<(Level, String)> {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    RECORDS.with(|r| r.borrow_mut().clear());
    f();
    RECORDS.with(|r| r.borrow_mut().drain(..).collect())
}

/// Levels of the records logged by `f`
pub fn levels<F: FnOnce()>(f: F) -> Vec<Level> {
    capture(f).into_iter().map(|(level, _)| level).collect()
}

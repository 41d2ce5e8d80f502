//! Minimal stderr logger.
//!
//! Records are printed as `[elapsed LEVEL crate] message`. With the
//! `tracing` feature, `init_tracing` installs a `tracing-subscriber`
//! formatter instead.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Targets owned by this workspace; everything else is a dependency.
const OWN_PREFIX: &str = "cardscan";

struct StderrLogger {
    own: LevelFilter,
    deps: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn threshold(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_PREFIX) {
            self.own
        } else {
            self.deps
        }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.threshold(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let crate_name = record.target().split("::").next().unwrap_or("");
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:8.3}s {:>5} {}] {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            crate_name,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger.
///
/// Records from the `cardscan*` crates pass at `level`; dependencies (image
/// codecs and the like) only at `warn` or above, unless `level` is stricter.
/// Only the first call has any effect.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        own: level,
        deps: level.min(LevelFilter::Warn),
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG` (default `info`).
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger(level: LevelFilter) -> StderrLogger {
        StderrLogger {
            own: level,
            deps: level.min(LevelFilter::Warn),
            started: Instant::now(),
        }
    }

    #[test]
    fn dependencies_are_capped_at_warn() {
        let l = logger(LevelFilter::Debug);
        assert_eq!(l.threshold("cardscan_locate::localizer"), LevelFilter::Debug);
        assert_eq!(l.threshold("cardscan"), LevelFilter::Debug);
        assert_eq!(l.threshold("png::decoder"), LevelFilter::Warn);
    }

    #[test]
    fn strict_levels_apply_everywhere() {
        let l = logger(LevelFilter::Error);
        assert_eq!(l.threshold("cardscan_phash"), LevelFilter::Error);
        assert_eq!(l.threshold("rayon_core"), LevelFilter::Error);
    }
}

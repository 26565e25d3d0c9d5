//! Leveled logging for heap events.
//!
//! Messages are prefixed with the rank that emitted them and routed to the
//! [`LogSink`] installed with [`set_sink`]. With the `std` feature and no sink
//! installed they are written to stderr.

use core::{
    fmt,
    sync::atomic::{AtomicU8, AtomicUsize, Ordering},
};

use spin::Once;

macro_rules! log {
    ($level:expr, $($arg:tt)*) => {
        $crate::log::log($level, format_args!($($arg)*))
    };
}

macro_rules! trace {
    ($($arg:tt)*) => {
        log!($crate::log::LogLevel::Trace, $($arg)*)
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        log!($crate::log::LogLevel::Debug, $($arg)*)
    };
}

macro_rules! info {
    ($($arg:tt)*) => {
        log!($crate::log::LogLevel::Info, $($arg)*)
    };
}

macro_rules! warn {
    ($($arg:tt)*) => {
        log!($crate::log::LogLevel::Warn, $($arg)*)
    };
}

macro_rules! error {
    ($($arg:tt)*) => {
        log!($crate::log::LogLevel::Error, $($arg)*)
    };
}

const UNKNOWN_RANK: usize = usize::MAX;

static SINK: Once<&'static dyn LogSink> = Once::new();
static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);
static RANK: AtomicUsize = AtomicUsize::new(UNKNOWN_RANK);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Trace,
            1 => Self::Debug,
            2 => Self::Info,
            3 => Self::Warn,
            _ => Self::Error,
        }
    }
}

/// Destination of log messages.
pub trait LogSink: Sync {
    fn write(&self, level: LogLevel, rank: Option<usize>, message: fmt::Arguments<'_>);
}

/// Installs the process-wide sink.
///
/// Only the first call has an effect; returns `false` if a sink was already
/// installed.
pub fn set_sink(sink: &'static dyn LogSink) -> bool {
    let mut installed = false;
    SINK.call_once(|| {
        installed = true;
        sink
    });
    installed
}

/// Sets the least severe level that is still emitted.
pub fn set_max_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

#[must_use]
pub fn max_level() -> LogLevel {
    LogLevel::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

/// Sets the rank printed in front of every message.
pub fn set_rank(rank: usize) {
    RANK.store(rank, Ordering::Relaxed);
}

fn rank() -> Option<usize> {
    let rank = RANK.load(Ordering::Relaxed);
    (rank != UNKNOWN_RANK).then_some(rank)
}

#[must_use]
pub fn enabled(level: LogLevel) -> bool {
    level >= max_level()
}

pub fn log(level: LogLevel, message: fmt::Arguments) {
    if !enabled(level) {
        return;
    }
    if let Some(sink) = SINK.get() {
        sink.write(level, rank(), message);
        return;
    }
    #[cfg(feature = "std")]
    StderrSink.write(level, rank(), message);
}

/// Writes colored messages to the standard error stream.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

#[cfg(feature = "std")]
impl LogSink for StderrSink {
    fn write(&self, level: LogLevel, rank: Option<usize>, message: fmt::Arguments<'_>) {
        if let Some(rank) = rank {
            std::eprintln!("[{rank}] {} {}", LevelFormat(level), message);
        } else {
            std::eprintln!("[?] {} {}", LevelFormat(level), message);
        }
    }
}

pub struct LevelFormat(pub LogLevel);

impl fmt::Display for LevelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = match self.0 {
            LogLevel::Trace => 35,
            LogLevel::Debug => 34,
            LogLevel::Info => 32,
            LogLevel::Warn => 33,
            LogLevel::Error => 31,
        };
        let msg = match self.0 {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => " INFO",
            LogLevel::Warn => " WARN",
            LogLevel::Error => "ERROR",
        };
        write!(f, "\x1B[{color};1m{msg}\x1B[0m")
    }
}

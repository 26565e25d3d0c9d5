//! Shared error plumbing for the symmetric heap crates.
//!
//! [`Location`] is captured implicitly by snafu context selectors, so every
//! error records the call site that produced it. [`Report`] renders an error
//! together with its `source()` chain, which is what ends up in the message
//! handed to a job-wide abort.

#![no_std]

use core::{
    error::Error,
    fmt,
    panic::Location as PanicLocation,
};

use snafu::GenerateImplicitData;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(&'static PanicLocation<'static>);

impl Location {
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.0.file()
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.0.line()
    }
}

impl Default for Location {
    #[track_caller]
    fn default() -> Self {
        Self(PanicLocation::caller())
    }
}

impl GenerateImplicitData for Location {
    #[track_caller]
    fn generate() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Errors that remember where they were raised.
///
/// Implemented by error enums whose variants all carry an implicit
/// [`Location`], so that [`Report`] can print it.
pub trait Located {
    fn location(&self) -> Location;
}

/// Multi-line rendering of an error and its causes.
///
/// ```text
/// Error: access out of symmetric heap bounds: ...
///   at crates/symheap/src/heap.rs:120:9
///
/// Caused by:
///    0: ...
/// ```
pub struct Report<E> {
    error: E,
    location: Option<Location>,
}

impl<E> Report<E> {
    pub fn new(error: E) -> Self {
        Self {
            error,
            location: None,
        }
    }

    /// Creates a report that also prints where `error` was raised.
    pub fn located(error: E) -> Self
    where
        E: Located,
    {
        let location = Some(error.location());
        Self { error, location }
    }

    pub fn error(&self) -> &E {
        &self.error
    }
}

impl<E> fmt::Debug for Report<E>
where
    E: Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E> fmt::Display for Report<E>
where
    E: Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.error)?;
        if let Some(loc) = &self.location {
            writeln!(f, "  at {loc}")?;
        }
        let mut source = self.error.source();
        if source.is_some() {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
        }
        let mut index = 0;
        while let Some(s) = source {
            writeln!(f, "{index:4}: {s}")?;
            source = s.source();
            index += 1;
        }
        Ok(())
    }
}

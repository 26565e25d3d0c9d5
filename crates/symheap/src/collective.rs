//! Interface to the surrounding communication runtime.

/// The services a symmetric heap needs from the job it runs in.
///
/// Implementations wrap the runtime's rank identity, its job-wide barrier and
/// its job-wide abort.
pub trait Collective {
    /// Rank of the calling process within the job.
    fn rank(&self) -> usize;

    /// Blocks until every rank of the job has reached the barrier.
    fn barrier_all(&self);

    /// Terminates every rank of the job.
    fn abort(&self, message: &str) -> !;
}

impl<C> Collective for &C
where
    C: Collective + ?Sized,
{
    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn barrier_all(&self) {
        (**self).barrier_all();
    }

    fn abort(&self, message: &str) -> ! {
        (**self).abort(message)
    }
}

/// A job made of the calling process alone.
///
/// The barrier returns immediately and an abort panics with the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleRank;

impl Collective for SingleRank {
    fn rank(&self) -> usize {
        0
    }

    fn barrier_all(&self) {}

    fn abort(&self, message: &str) -> ! {
        panic!("symmetric heap abort\n\n{message}");
    }
}

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Shared stop flag for a running stream.
///
/// Cloning yields a handle to the same flag, so a caller can keep one clone and cancel from
/// another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the stream to stop issuing new frames.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Counts {
    live: AtomicUsize,
    peak: AtomicUsize,
}

/// Counts composed frame buffers that are currently alive, and the most ever alive at once.
///
/// A frame is live from the moment its composition starts until the stream drops it after the
/// sink has taken it.
#[derive(Clone, Debug, Default)]
pub struct LiveFrames {
    counts: Arc<Counts>,
}

impl LiveFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames alive right now.
    pub fn live(&self) -> usize {
        self.counts.live.load(Ordering::SeqCst)
    }

    /// Highest `live()` observed since the last reset.
    pub fn peak(&self) -> usize {
        self.counts.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_peak(&self) {
        self.counts.peak.store(self.live(), Ordering::SeqCst);
    }

    /// Account for one more live frame until the guard drops.
    pub(crate) fn acquire(&self) -> LiveFrameGuard {
        let now = self.counts.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counts.peak.fetch_max(now, Ordering::SeqCst);
        LiveFrameGuard {
            counts: self.counts.clone(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct LiveFrameGuard {
    counts: Arc<Counts>,
}

impl Drop for LiveFrameGuard {
    fn drop(&mut self) {
        self.counts.live.fetch_sub(1, Ordering::SeqCst);
    }
}

//! Abstract sample producer trait.
//!
//! The engine never touches a medium itself — no containers, no frame
//! decoding, no color-space math. A [`SampleSource`] hands it one
//! already-extracted luminance sample per call, in `0..=255`, and
//! signals end-of-stream by returning `None`.

use std::io;

/// One independent input whose samples must all be processed before the
/// source counts as complete.
pub trait SampleSource: Send {
    /// Stable identifier for reports (a path, a device name, ...).
    fn id(&self) -> &str;

    /// Acquire the underlying medium. Called once, before any
    /// [`next_sample`](Self::next_sample) call. A source that fails to
    /// open is marked failed, never enters the scheduler, and is
    /// excluded from aggregation.
    fn open(&mut self) -> io::Result<()>;

    /// Produce the next luminance sample, or `None` at end of source.
    fn next_sample(&mut self) -> Option<u8>;
}

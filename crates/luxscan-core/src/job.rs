//! Abstract unit of schedulable work.

/// One schedulable item of processing work.
///
/// A job is created by the driver, owned exclusively by the scheduler
/// queue until a worker dequeues it, and dropped after execution. It has
/// no identity and no result channel: anything a job needs to report, it
/// records on the shared state it was constructed with.
///
/// `run` must not panic; the scheduler has no per-unit error channel and
/// a panicking job takes its worker thread down with it. Implementations
/// trap their own failures and record them on their bound context.
pub trait Job: Send {
    /// Execute this unit of work.
    fn run(&self);
}

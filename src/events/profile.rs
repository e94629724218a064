use crate::events::event_shape;
use crate::model::{Backtrace, PmcEvents, Process, Text, Thread, Timestamp, TimestampDelta};

event_shape! {
    /// A statistical sample of what a core was running (`time-profile`).
    pub struct TimeProfile, timestamp = sample_time {
        sample_time: Timestamp => ("Sample Time", "sample-time"),
        thread: Thread => ("Thread", "thread"),
        process: Process => ("Process", "process"),
        core: Text => ("Core", "core"),
        thread_state: Text => ("State", "thread-state"),
        weight: TimestampDelta => ("Weight", "weight"),
        backtrace: Backtrace => ("Backtrace", "backtrace"),
    }
}

event_shape! {
    /// A cycle-weighted sample (`cpu-profile`).
    pub struct CpuProfile, timestamp = sample_time {
        sample_time: Timestamp => ("Sample Time", "sample-time"),
        thread: Thread => ("Thread", "thread"),
        process: Process => ("Process", "process"),
        core: Text => ("Core", "core"),
        thread_state: Text => ("State", "thread-state"),
        cycles: TimestampDelta => ("Cycles", "cycle-weight"),
        weight: TimestampDelta => ("Weight", "weight"),
        backtrace: Backtrace => ("Backtrace", "backtrace"),
    }
}

event_shape! {
    /// A sample carrying hardware counter values (`counters-profile`).
    pub struct CountersProfile, timestamp = sample_time {
        sample_time: Timestamp => ("Sample Time", "sample-time"),
        thread: Thread => ("Thread", "thread"),
        process: Process => ("Process", "process"),
        core: Text => ("Core", "core"),
        thread_state: Text => ("State", "thread-state"),
        backtrace: Backtrace => ("Backtrace", "backtrace"),
        weight: TimestampDelta => ("Weight", "any"),
        counter_values: PmcEvents => ("Counter Value Array", "pmc-events"),
    }
}

use crate::events::event_shape;
use crate::model::{Integer, Process, Text, Thread, Timestamp, TimestampDelta};

event_shape! {
    /// An interval a thread spent in one scheduling state (`thread-state`).
    pub struct ThreadState, timestamp = start_time {
        start_time: Timestamp => ("Start Time", "start-time"),
        duration: TimestampDelta => ("Duration", "duration"),
        thread: Thread => ("Thread", "thread"),
        state: Text => ("State", "thread-state"),
        process: Process => ("Process", "process"),
        core: Text => ("Core", "core"),
        running_time: TimestampDelta => ("Running Time", "duration-on-core"),
        wait_time: TimestampDelta => ("Wait Time", "duration-waiting"),
        priority: Integer => ("Priority", "sched-priority"),
        note: Text => ("Note", "narrative"),
        summary: Text => ("Summary", "narrative"),
    }
}

event_shape! {
    pub struct PotentialHang, timestamp = start {
        start: Timestamp => ("Start", "start-time"),
        duration: TimestampDelta => ("Duration", "duration"),
        hang_type: Text => ("Hang Type", "hang-type"),
        thread: Thread => ("Thread", "thread"),
        process: Process => ("Process", "process"),
    }
}

use crate::events::event_shape;
use crate::model::{Backtrace, Integer, Process, Text, Thread, Timestamp, TimestampDelta};

event_shape! {
    /// Maps a kdebug code to a system call name (`syscall-name-map`).
    pub struct SyscallNameMap, timestamp = timestamp {
        timestamp: Timestamp => ("Timestamp", "event-time"),
        name: Text => ("Name", "syscall"),
        class: Text => ("Class", "kdebug-class"),
        subclass: Text => ("Subclass", "kdebug-subclass"),
        code: Integer => ("Code", "kdebug-code"),
    }
}

event_shape! {
    pub struct VirtualMemory, timestamp = start_time {
        start_time: Timestamp => ("Start Time", "start-time"),
        duration: TimestampDelta => ("Duration", "duration"),
        thread: Thread => ("Thread", "thread"),
        operation: Text => ("Operation", "vm-op"),
        process: Process => ("Process", "process"),
        cpu_time: TimestampDelta => ("CPU Time", "duration-on-core"),
        wait_time: TimestampDelta => ("Wait Time", "duration-waiting"),
        address: Text => ("Address", "address"),
        size: Integer => ("Size", "size-in-bytes"),
        stack: Backtrace => ("Stack", "backtrace"),
    }
}

event_shape! {
    /// One system call, with its arguments as rendered by the exporter.
    pub struct Syscall, timestamp = start_time {
        start_time: Timestamp => ("Start Time", "start-time"),
        duration: TimestampDelta => ("Duration", "duration"),
        thread: Thread => ("Thread", "thread"),
        call: Text => ("Call", "syscall"),
        process: Process => ("Process", "process"),
        cpu_time: TimestampDelta => ("CPU Time", "duration-on-core"),
        wait_time: TimestampDelta => ("Wait Time", "duration-waiting"),
        arg1: Text => ("Arg1", "syscall-arg"),
        arg2: Text => ("Arg2", "syscall-arg"),
        arg3: Text => ("Arg3", "syscall-arg"),
        arg4: Text => ("Arg4", "syscall-arg"),
        return_value: Text => ("Return", "syscall-return"),
        errno: Text => ("errno", "syscall-return"),
        stack: Backtrace => ("Stack", "backtrace"),
        note: Text => ("Note", "narrative"),
        signature: Text => ("Signature", "formatted-label"),
    }
}

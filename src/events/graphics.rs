use crate::events::event_shape;
use crate::model::{Integer, Process, Text, Timestamp, TimestampDelta, UInt64};

event_shape! {
    /// A command buffer's lifetime on a GPU channel (`metal-gpu-intervals`).
    pub struct MetalGpuInterval, timestamp = creation {
        creation: Timestamp => ("Creation", "start-time"),
        duration: TimestampDelta => ("Duration", "duration"),
        channel_name: Text => ("Channel Name", "gpu-channel-name"),
        frame: Integer => ("Frame", "gpu-frame-number"),
        cpu_to_gpu_latency: TimestampDelta => ("CPU to GPU Latency", "duration"),
        depth: Integer => ("Depth", "metal-nesting-level"),
        label: Text => ("Label", "formatted-label"),
        state: Text => ("State", "gpu-state"),
        connection_uuid: Text => ("Connection UUID", "connection-uuid64"),
        color: Integer => ("Color", "render-buffer-depth"),
        process: Process => ("Process", "process"),
        metal_device: Text => ("Metal Device", "metal-device-name"),
        channel_subtitle: Text => ("Channel Subtitle", "metal-object-label"),
        iosurface_accesses: Text => ("IOSurface Accesses", "formatted-label"),
        bytes: Integer => ("Bytes", "size-in-bytes"),
        command_buffer_id: UInt64 => ("Command Buffer Id" | "Commmand Buffer Id", "metal-command-buffer-id"),
        encoder_id: UInt64 => ("Encoder Id", "metal-command-buffer-id"),
        gpu_submission_id: UInt64 => ("GPU Submission Id", "uint64"),
    }
}

event_shape! {
    pub struct DisplayVsyncInterval, timestamp = timestamp {
        timestamp: Timestamp => ("Timestamp", "start-time"),
        duration: TimestampDelta => ("Duration", "duration"),
        display_name: Text => ("Display Name", "display-name"),
        color: Integer => ("Color", "render-buffer-depth"),
        label: Text => ("Label", "narrative"),
        event: Text => ("Event", "vsync-event"),
    }
}

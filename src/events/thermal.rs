use crate::events::event_shape;
use crate::model::{Boolean, Text, Timestamp, TimestampDelta};

event_shape! {
    /// An interval the device spent in one thermal state.
    pub struct DeviceThermalStateInterval, timestamp = start {
        start: Timestamp => ("Start", "start-time"),
        duration: TimestampDelta => ("Duration", "duration"),
        end: Timestamp => ("End", "start-time"),
        thermal_state: Text => ("Thermal State", "thermal-state"),
        track: Text => ("Track", "string"),
        is_induced: Boolean => ("Is Induced", "boolean"),
        narrative: Text => ("Narrative", "narrative"),
    }
}

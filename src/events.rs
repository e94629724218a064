//! Record shapes: the typed events a table row can decode into.
//!
//! A shape binds `(column name, engineering type)` pairs to its fields. A table is decoded with
//! the first registered shape that binds every column of its schema (see
//! [`ShapeRegistry`](crate::ShapeRegistry)).

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::deserializer::Deserializer;
use crate::err::DeserializationResult;
use crate::model::XmlNode;

mod graphics;
mod profile;
mod scheduling;
mod system;
mod thermal;

pub use self::graphics::{DisplayVsyncInterval, MetalGpuInterval};
pub use self::profile::{CountersProfile, CpuProfile, TimeProfile};
pub use self::scheduling::{PotentialHang, ThreadState};
pub use self::system::{Syscall, SyscallNameMap, VirtualMemory};
pub use self::thermal::DeviceThermalStateInterval;

/// Binds one schema column to a field of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnBinding {
    pub name: &'static str,
    /// Other spellings of `name` seen in exports.
    pub aliases: &'static [&'static str],
    pub engineering_type: &'static str,
    pub field: &'static str,
}

impl ColumnBinding {
    pub fn matches(&self, name: &str, engineering_type: &str) -> bool {
        (self.name == name || self.aliases.iter().any(|alias| *alias == name))
            && self.engineering_type == engineering_type
    }
}

pub trait EventShape: Default + Into<Event> + 'static {
    const KIND: EventKind;
    const COLUMNS: &'static [ColumnBinding];

    /// Decodes the value of a column into the field it is bound to.
    fn decode_column(
        &mut self,
        field: &'static str,
        node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()>;

    /// Nanosecond timestamp used to order the record, if the row carried one.
    fn timestamp(&self) -> Option<i64>;

    fn binding(name: &str, engineering_type: &str) -> Option<&'static ColumnBinding> {
        Self::COLUMNS
            .iter()
            .find(|binding| binding.matches(name, engineering_type))
    }
}

/// Declares a shape struct whose fields are all optional shared models, with its column
/// bindings and the field its timestamp is taken from.
macro_rules! event_shape {
    (
        $(#[$meta:meta])*
        pub struct $name:ident, timestamp = $timestamp:ident {
            $($field:ident: $ty:ty => ($column:literal $(| $alias:literal)*, $engineering_type:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
        pub struct $name {
            $(pub $field: Option<std::sync::Arc<$ty>>,)+
        }

        impl $crate::events::EventShape for $name {
            const KIND: $crate::events::EventKind = $crate::events::EventKind::$name;
            const COLUMNS: &'static [$crate::events::ColumnBinding] = &[
                $($crate::events::ColumnBinding {
                    name: $column,
                    aliases: &[$($alias),*],
                    engineering_type: $engineering_type,
                    field: stringify!($field),
                },)+
            ];

            fn decode_column(
                &mut self,
                field: &'static str,
                node: &$crate::model::XmlNode,
                de: &mut $crate::deserializer::Deserializer<'_>,
            ) -> $crate::err::DeserializationResult<()> {
                $(
                    if field == stringify!($field) {
                        self.$field = de.decode(Some(node))?;
                        return Ok(());
                    }
                )+

                Err($crate::err::DeserializationError::UnknownColumn {
                    shape: Self::KIND.as_str(),
                    name: field.to_owned(),
                    engineering_type: node.name.clone(),
                })
            }

            fn timestamp(&self) -> Option<i64> {
                self.$timestamp.as_ref().map(|timestamp| timestamp.value)
            }
        }

        impl From<$name> for $crate::events::Event {
            fn from(event: $name) -> Self {
                $crate::events::Event::$name(event)
            }
        }
    };
}

pub(crate) use event_shape;

macro_rules! event_kinds {
    ($($kind:ident => $tag:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum EventKind {
            $($kind,)+
        }

        impl EventKind {
            /// Every kind, in default registration order.
            pub const ALL: &'static [EventKind] = &[$(EventKind::$kind,)+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(EventKind::$kind => $tag,)+
                }
            }
        }

        /// One decoded table row.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        #[serde(tag = "kind", rename_all = "kebab-case")]
        pub enum Event {
            $($kind($kind),)+
        }

        impl Event {
            pub fn kind(&self) -> EventKind {
                match self {
                    $(Event::$kind(_) => EventKind::$kind,)+
                }
            }

            pub fn timestamp(&self) -> Option<i64> {
                match self {
                    $(Event::$kind(event) => EventShape::timestamp(event),)+
                }
            }
        }
    };
}

event_kinds!(
    TimeProfile => "time-profile",
    ThreadState => "thread-state",
    DeviceThermalStateInterval => "device-thermal-state-interval",
    SyscallNameMap => "syscall-name-map",
    VirtualMemory => "virtual-memory",
    Syscall => "syscall",
    PotentialHang => "potential-hang",
    CpuProfile => "cpu-profile",
    MetalGpuInterval => "metal-gpu-interval",
    DisplayVsyncInterval => "display-vsync-interval",
    CountersProfile => "counters-profile",
);

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind `{}`", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Integer, Text, Timestamp};
    use crate::object_cache::ObjectCache;
    use crate::ParserSettings;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_kind_names_round_trip_through_from_str() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(*kind));
        }
        assert!("time profile".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_shape_decodes_bound_columns() {
        let settings = ParserSettings::default();
        let mut cache = ObjectCache::new();
        let mut de = Deserializer::new(&mut cache, &settings);
        let mut event = SyscallNameMap::default();

        let binding = SyscallNameMap::binding("Name", "syscall").unwrap();
        assert_eq!(binding.field, "name");

        let name = XmlNode::new("syscall").with_attribute("fmt", "read");
        event.decode_column(binding.field, &name, &mut de).unwrap();

        let time = XmlNode::new("event-time").with_text("5");
        event.decode_column("timestamp", &time, &mut de).unwrap();

        assert_eq!(event.name, Some(Arc::new(Text::new("read"))));
        assert_eq!(event.timestamp, Some(Arc::new(Timestamp::new(5))));
        assert_eq!(event.code, None::<Arc<Integer>>);

        let event: Event = event.into();
        assert_eq!(event.kind(), EventKind::SyscallNameMap);
        assert_eq!(event.timestamp(), Some(5));
    }

    #[test]
    fn test_column_aliases_bind_the_same_field() {
        let binding = MetalGpuInterval::binding("Commmand Buffer Id", "metal-command-buffer-id")
            .unwrap();
        assert_eq!(binding.field, "command_buffer_id");
        assert_eq!(
            MetalGpuInterval::binding("Command Buffer Id", "metal-command-buffer-id"),
            Some(binding)
        );
        assert_eq!(MetalGpuInterval::binding("Commmand Buffer Id", "uint64"), None);
    }

    #[test]
    fn test_unbound_field_is_an_error() {
        let settings = ParserSettings::default();
        let mut cache = ObjectCache::new();
        let mut de = Deserializer::new(&mut cache, &settings);
        let mut event = SyscallNameMap::default();

        let node = XmlNode::new("string").with_attribute("fmt", "x");
        let err = event.decode_column("label", &node, &mut de).unwrap_err();

        assert!(
            matches!(
                err,
                crate::err::DeserializationError::UnknownColumn {
                    shape: "syscall-name-map",
                    ..
                }
            ),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_events_serialize_with_their_kind() {
        let event = Event::from(PotentialHang {
            start: Some(Arc::new(Timestamp::new(10))),
            ..PotentialHang::default()
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "potential-hang");
        assert_eq!(json["start"], 10);
        assert!(json["thread"].is_null());
    }
}

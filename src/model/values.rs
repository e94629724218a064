//! Leaf values. Each one is a single custom field read from the element's text or `fmt`.

use std::fmt;

use serde::Serialize;

use crate::deserializer::{Deserializer, FieldDescriptor, TraceObject, parse_text};
use crate::err::DeserializationResult;
use crate::model::XmlNode;

const VALUE: &[FieldDescriptor] = &[FieldDescriptor::custom("value")];

macro_rules! numeric_value {
    ($(#[$meta:meta])* $name:ident($inner:ty), $type_name:literal, $expected:literal) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name {
            pub value: $inner,
        }

        impl $name {
            pub fn new(value: $inner) -> Self {
                $name { value }
            }
        }

        impl TraceObject for $name {
            const TYPE_NAME: &'static str = $type_name;
            const FIELDS: &'static [FieldDescriptor] = VALUE;

            fn decode_custom(
                &mut self,
                field: &'static str,
                node: &XmlNode,
                de: &mut Deserializer<'_>,
            ) -> DeserializationResult<()> {
                match field {
                    "value" => {
                        self.value = parse_text(node, $expected)?;
                        Ok(())
                    }
                    _ => de.unknown_custom_field::<Self>(field),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.value)
            }
        }
    };
}

numeric_value!(
    /// A signed integer carried as element text.
    Integer(i64),
    "integer",
    "an integer"
);

numeric_value!(UInt64(u64), "uint64", "an unsigned integer");

numeric_value!(
    /// A point in time, in nanoseconds since the start of the recording.
    Timestamp(i64),
    "timestamp",
    "a nanosecond timestamp"
);

numeric_value!(
    /// A span of time in nanoseconds.
    TimestampDelta(i64),
    "timestamp-delta",
    "a nanosecond duration"
);

/// True unless the element text is exactly `0`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Boolean {
    pub value: bool,
}

impl TraceObject for Boolean {
    const TYPE_NAME: &'static str = "boolean";
    const FIELDS: &'static [FieldDescriptor] = VALUE;

    fn decode_custom(
        &mut self,
        field: &'static str,
        node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        match field {
            "value" => {
                self.value = node.text.trim() != "0";
                Ok(())
            }
            _ => de.unknown_custom_field::<Self>(field),
        }
    }
}

/// The human readable rendering (`fmt` attribute) of an element, or `""` without one.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Text {
    pub value: String,
}

impl Text {
    pub fn new(value: impl Into<String>) -> Self {
        Text {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl TraceObject for Text {
    const TYPE_NAME: &'static str = "text";
    const FIELDS: &'static [FieldDescriptor] = VALUE;

    fn decode_custom(
        &mut self,
        field: &'static str,
        node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        match field {
            "value" => {
                self.value = node.attribute("fmt").unwrap_or_default().to_owned();
                Ok(())
            }
            _ => de.unknown_custom_field::<Self>(field),
        }
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

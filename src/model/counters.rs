use std::collections::BTreeMap;

use log::trace;
use serde::Serialize;

use crate::deserializer::{Deserializer, FieldDescriptor, TraceObject};
use crate::err::DeserializationResult;
use crate::model::XmlNode;

/// Hardware counter values of one sample: `<pmc-events>12 0 4096</pmc-events>`.
///
/// Values are always addressable by their position. When counter names were configured
/// (see [`ParserSettings::counter_names`](crate::ParserSettings::counter_names)), the first
/// `n` values are also addressable by name. Tokens that are not integers are skipped, but keep
/// their position.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PmcEvents {
    pub by_index: BTreeMap<usize, i64>,
    pub by_name: BTreeMap<String, i64>,
}

impl PmcEvents {
    pub fn get(&self, index: usize) -> Option<i64> {
        self.by_index.get(&index).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<i64> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}

impl TraceObject for PmcEvents {
    const TYPE_NAME: &'static str = "pmc-events";
    const FIELDS: &'static [FieldDescriptor] = &[FieldDescriptor::custom("counter_values")];

    fn decode_custom(
        &mut self,
        field: &'static str,
        node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        if field != "counter_values" {
            return de.unknown_custom_field::<Self>(field);
        }

        let names = de.settings().get_counter_names();

        for (index, token) in node.text.split(' ').enumerate() {
            let Ok(value) = token.trim().parse::<i64>() else {
                trace!("Skipping non-numeric counter value `{}` at {}", token, index);
                continue;
            };

            self.by_index.insert(index, value);
            if let Some(name) = names.get(index) {
                self.by_name.insert(name.clone(), value);
            }
        }

        Ok(())
    }
}

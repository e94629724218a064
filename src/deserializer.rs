//! Schema-less structural decoding of a single position (a row column, or a child of one).

use std::str::FromStr;
use std::sync::Arc;

use log::debug;

use crate::ParserSettings;
use crate::err::{DeserializationError, DeserializationResult};
use crate::model::XmlNode;
use crate::object_cache::{Cacheable, Lookup, ObjectCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Extracted by the type itself, from anywhere in the node (attributes, text, a child).
    Custom,
    /// Decoded from the next unclaimed child, in declaration order.
    Positional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn custom(name: &'static str) -> Self {
        FieldDescriptor {
            name,
            kind: FieldKind::Custom,
        }
    }

    pub const fn positional(name: &'static str) -> Self {
        FieldDescriptor {
            name,
            kind: FieldKind::Positional,
        }
    }
}

/// A type that can be decoded from an element of the export.
///
/// `FIELDS` is walked by [`Deserializer::decode`]: every custom field is handed to
/// [`decode_custom`](TraceObject::decode_custom) first, then the positional fields are matched
/// against the element's children in order.
pub trait TraceObject: Default + Cacheable {
    const TYPE_NAME: &'static str;
    const FIELDS: &'static [FieldDescriptor];

    fn decode_custom(
        &mut self,
        field: &'static str,
        _node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        de.unknown_custom_field::<Self>(field)
    }

    fn decode_positional(
        &mut self,
        field: &'static str,
        _node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        de.unknown_positional_field::<Self>(field)
    }
}

pub struct Deserializer<'a> {
    cache: &'a mut ObjectCache,
    settings: &'a ParserSettings,
}

impl<'a> Deserializer<'a> {
    pub fn new(cache: &'a mut ObjectCache, settings: &'a ParserSettings) -> Self {
        Deserializer { cache, settings }
    }

    pub fn settings(&self) -> &'a ParserSettings {
        self.settings
    }

    pub fn cache(&self) -> &ObjectCache {
        self.cache
    }

    /// Decodes `node` as a `T`.
    ///
    /// `Ok(None)` is the absent value: a missing position, a `<sentinel/>`, a reference to an
    /// id that was never defined (or was defined empty), or an allowed empty aggregate.
    pub fn decode<T: TraceObject>(
        &mut self,
        node: Option<&XmlNode>,
    ) -> DeserializationResult<Option<Arc<T>>> {
        let node = match node {
            Some(node) if !node.is_sentinel() => node,
            _ => return Ok(None),
        };

        if let Some(id) = node.reference_id()? {
            return match self.cache.lookup(id) {
                Lookup::Found(object) => match T::from_cached(object) {
                    Some(object) => Ok(Some(Arc::clone(object))),
                    None => Err(DeserializationError::ReferenceTypeMismatch {
                        id,
                        expected: T::TYPE_NAME,
                        found: object.type_name(),
                    }),
                },
                Lookup::Absent => Ok(None),
                Lookup::NotFound => {
                    debug!(
                        "<{}> refers to unknown object {}, decoding `{}` as absent",
                        node.name,
                        id,
                        T::TYPE_NAME
                    );
                    Ok(None)
                }
            };
        }

        let definition_id = node.definition_id()?;
        let mut object = T::default();

        for field in T::FIELDS.iter().filter(|f| f.kind == FieldKind::Custom) {
            object.decode_custom(field.name, node, self)?;
        }

        let expected = T::FIELDS
            .iter()
            .filter(|f| f.kind == FieldKind::Positional)
            .count();

        if expected > node.children.len() {
            if self.settings.allows_empty_aggregate(T::TYPE_NAME) {
                if let Some(id) = definition_id {
                    self.cache.register_absent(id)?;
                }
                return Ok(None);
            }

            return Err(DeserializationError::MissingChildren {
                type_name: T::TYPE_NAME,
                element: node.name.clone(),
                expected,
                found: node.children.len(),
            });
        }

        let positional = T::FIELDS.iter().filter(|f| f.kind == FieldKind::Positional);
        for (field, child) in positional.zip(&node.children) {
            object.decode_positional(field.name, child, self)?;
        }

        let object = Arc::new(object);
        if let Some(id) = definition_id {
            self.cache.register(id, Arc::clone(&object))?;
        }

        Ok(Some(object))
    }

    pub fn unknown_custom_field<T: TraceObject>(
        &self,
        field: &'static str,
    ) -> DeserializationResult<()> {
        Err(DeserializationError::UnknownCustomField {
            type_name: T::TYPE_NAME,
            field,
        })
    }

    pub fn unknown_positional_field<T: TraceObject>(
        &self,
        field: &'static str,
    ) -> DeserializationResult<()> {
        Err(DeserializationError::UnknownPositionalField {
            type_name: T::TYPE_NAME,
            field,
        })
    }
}

/// Parses the trimmed text of `node`.
pub fn parse_text<T: FromStr>(node: &XmlNode, expected: &'static str) -> DeserializationResult<T> {
    let text = node.text.trim();
    text.parse().map_err(|_| DeserializationError::InvalidValue {
        element: node.name.clone(),
        value: text.to_owned(),
        expected,
    })
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    pub fn decode_standalone_with<T: TraceObject>(
        node: &XmlNode,
        settings: &ParserSettings,
    ) -> DeserializationResult<Option<Arc<T>>> {
        let mut cache = ObjectCache::new();
        Deserializer::new(&mut cache, settings).decode(Some(node))
    }

    pub fn decode_standalone<T: TraceObject>(
        node: &XmlNode,
    ) -> DeserializationResult<Option<Arc<T>>> {
        decode_standalone_with(node, &ParserSettings::default())
    }
}

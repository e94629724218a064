use std::fmt;
use std::marker::PhantomData;

use log::trace;

use crate::deserializer::Deserializer;
use crate::err::{DeserializationError, DeserializationResult};
use crate::events::{
    ColumnBinding, CountersProfile, CpuProfile, DeviceThermalStateInterval, DisplayVsyncInterval,
    Event, EventKind, EventShape, MetalGpuInterval, PotentialHang, Syscall, SyscallNameMap,
    ThreadState, TimeProfile, VirtualMemory,
};
use crate::model::XmlNode;
use crate::schema::Schema;

/// Decodes the rows of tables whose schema it is compatible with.
pub trait RowDecoder: Send + Sync {
    fn kind(&self) -> EventKind;

    fn columns(&self) -> &'static [ColumnBinding];

    /// True when every column of `schema` is bound by this decoder.
    fn is_compatible(&self, schema: &Schema) -> bool {
        let columns = self.columns();
        schema.columns.iter().all(|column| {
            columns
                .iter()
                .any(|binding| binding.matches(&column.name, &column.engineering_type))
        })
    }

    fn decode_row(
        &self,
        row: &XmlNode,
        schema: &Schema,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<Event>;
}

/// The [`RowDecoder`] of a statically known [`EventShape`].
pub struct ShapeDecoder<T>(PhantomData<fn() -> T>);

impl<T> ShapeDecoder<T> {
    pub fn new() -> Self {
        ShapeDecoder(PhantomData)
    }
}

impl<T> Default for ShapeDecoder<T> {
    fn default() -> Self {
        ShapeDecoder::new()
    }
}

impl<T: EventShape> RowDecoder for ShapeDecoder<T> {
    fn kind(&self) -> EventKind {
        T::KIND
    }

    fn columns(&self) -> &'static [ColumnBinding] {
        T::COLUMNS
    }

    fn decode_row(
        &self,
        row: &XmlNode,
        schema: &Schema,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<Event> {
        decode_row::<T>(row, schema, de).map(Into::into)
    }
}

/// Decodes `row` column by column into a `T`.
///
/// Columns that carry free-form content (see
/// [`ParserSettings::rescan_engineering_types`](crate::ParserSettings::rescan_engineering_types))
/// may define objects inside their own children that later rows refer to. Those children are
/// decoded as well, only so they end up in the identity cache.
pub fn decode_row<T: EventShape>(
    row: &XmlNode,
    schema: &Schema,
    de: &mut Deserializer<'_>,
) -> DeserializationResult<T> {
    if row.children.len() != schema.columns.len() {
        return Err(DeserializationError::RowColumnMismatch {
            schema: schema.display_name().to_owned(),
            expected: schema.columns.len(),
            found: row.children.len(),
        });
    }

    let mut event = T::default();

    for (column, node) in schema.columns.iter().zip(&row.children) {
        let binding = T::binding(&column.name, &column.engineering_type).ok_or_else(|| {
            DeserializationError::UnknownColumn {
                shape: T::KIND.as_str(),
                name: column.name.clone(),
                engineering_type: column.engineering_type.clone(),
            }
        })?;

        event.decode_column(binding.field, node, de)?;

        let settings = de.settings();
        if settings.should_rescan(&node.name) || settings.should_rescan(&column.engineering_type) {
            rescan::<T>(node, schema, de)?;
        }
    }

    Ok(event)
}

fn rescan<T: EventShape>(
    node: &XmlNode,
    schema: &Schema,
    de: &mut Deserializer<'_>,
) -> DeserializationResult<()> {
    let mut scratch = T::default();

    for child in &node.children {
        let Some(column) = schema
            .columns
            .iter()
            .find(|column| column.engineering_type == child.name)
        else {
            continue;
        };

        if let Some(binding) = T::binding(&column.name, &column.engineering_type) {
            trace!("Rescanning <{}> inside <{}>", child.name, node.name);
            scratch.decode_column(binding.field, child, de)?;
        }
    }

    Ok(())
}

/// Ordered list of row decoders. The first compatible decoder wins.
pub struct ShapeRegistry {
    decoders: Vec<Box<dyn RowDecoder>>,
}

impl ShapeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        ShapeRegistry {
            decoders: Vec::new(),
        }
    }

    pub fn register<T: EventShape>(mut self) -> Self {
        self.decoders.push(Box::new(ShapeDecoder::<T>::new()));
        self
    }

    pub fn register_decoder(mut self, decoder: Box<dyn RowDecoder>) -> Self {
        self.decoders.push(decoder);
        self
    }

    pub fn select(&self, schema: &Schema) -> Option<&dyn RowDecoder> {
        self.decoders
            .iter()
            .find(|decoder| decoder.is_compatible(schema))
            .map(|decoder| decoder.as_ref())
    }

    pub fn is_compatible(&self, schema: &Schema, kind: EventKind) -> bool {
        self.decoders
            .iter()
            .any(|decoder| decoder.kind() == kind && decoder.is_compatible(schema))
    }

    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.decoders.iter().map(|decoder| decoder.kind())
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        ShapeRegistry::new()
            .register::<TimeProfile>()
            .register::<ThreadState>()
            .register::<DeviceThermalStateInterval>()
            .register::<SyscallNameMap>()
            .register::<VirtualMemory>()
            .register::<Syscall>()
            .register::<PotentialHang>()
            .register::<CpuProfile>()
            .register::<MetalGpuInterval>()
            .register::<DisplayVsyncInterval>()
            .register::<CountersProfile>()
    }
}

impl fmt::Debug for ShapeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

//! Per-table identity cache.
//!
//! The exporter writes every object in full once (`id="N"`) and refers back to it afterwards
//! (`ref="N"`). Ids are only meaningful inside the table that defined them, so a fresh cache
//! is created for every table.

use std::sync::Arc;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use crate::deserializer::TraceObject;
use crate::err::{DeserializationError, DeserializationResult};
use crate::model::{
    Backtrace, Boolean, Frame, Integer, Module, PmcEvents, Process, Text, Thread, Timestamp,
    TimestampDelta, UInt64,
};

pub type FastMap<K, V> = HashMap<K, V, ahash::RandomState>;

/// Conversion between a concrete model and its slot in the cache.
pub trait Cacheable: Sized {
    fn into_cached(object: Arc<Self>) -> CachedObject;
    fn from_cached(object: &CachedObject) -> Option<&Arc<Self>>;
}

macro_rules! cached_objects {
    ($($variant:ident),+ $(,)?) => {
        /// A decoded object as stored in the cache.
        #[derive(Debug, Clone)]
        pub enum CachedObject {
            $($variant(Arc<$variant>),)+
        }

        impl CachedObject {
            pub fn type_name(&self) -> &'static str {
                match self {
                    $(CachedObject::$variant(_) => <$variant as TraceObject>::TYPE_NAME,)+
                }
            }
        }

        $(
            impl Cacheable for $variant {
                fn into_cached(object: Arc<Self>) -> CachedObject {
                    CachedObject::$variant(object)
                }

                fn from_cached(object: &CachedObject) -> Option<&Arc<Self>> {
                    match object {
                        CachedObject::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )+
    };
}

cached_objects!(
    Integer,
    UInt64,
    Boolean,
    Text,
    Timestamp,
    TimestampDelta,
    Process,
    Thread,
    Module,
    Frame,
    Backtrace,
    PmcEvents,
);

/// Index of an entry in the cache arena. Only valid for the cache that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(usize);

#[derive(Debug)]
pub enum Lookup<'a> {
    Found(&'a CachedObject),
    /// The id was defined by a legitimately empty aggregate.
    Absent,
    NotFound,
}

#[derive(Debug, Default)]
pub struct ObjectCache {
    arena: Vec<Option<CachedObject>>,
    index: FastMap<u32, ObjectHandle>,
}

impl ObjectCache {
    pub fn new() -> Self {
        ObjectCache::default()
    }

    pub fn register<T: Cacheable>(
        &mut self,
        id: u32,
        object: Arc<T>,
    ) -> DeserializationResult<ObjectHandle> {
        self.insert(id, Some(T::into_cached(object)))
    }

    /// Remembers that `id` names an object that decodes to nothing.
    pub fn register_absent(&mut self, id: u32) -> DeserializationResult<ObjectHandle> {
        self.insert(id, None)
    }

    fn insert(&mut self, id: u32, slot: Option<CachedObject>) -> DeserializationResult<ObjectHandle> {
        match self.index.entry(id) {
            Entry::Occupied(_) => Err(DeserializationError::DuplicateObjectId { id }),
            Entry::Vacant(entry) => {
                let handle = ObjectHandle(self.arena.len());
                self.arena.push(slot);
                entry.insert(handle);
                Ok(handle)
            }
        }
    }

    pub fn handle(&self, id: u32) -> Option<ObjectHandle> {
        self.index.get(&id).copied()
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&CachedObject> {
        self.arena.get(handle.0).and_then(Option::as_ref)
    }

    pub fn lookup(&self, id: u32) -> Lookup<'_> {
        match self.handle(id) {
            None => Lookup::NotFound,
            Some(handle) => match self.get(handle) {
                Some(object) => Lookup::Found(object),
                None => Lookup::Absent,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_references_share_the_registered_object() {
        let mut cache = ObjectCache::new();
        let process = Arc::new(Process {
            name: Some("Demo (7)".to_owned()),
            ..Process::default()
        });

        cache.register(7, Arc::clone(&process)).unwrap();

        let resolved: Vec<Arc<Process>> = (0..3)
            .map(|_| match cache.lookup(7) {
                Lookup::Found(object) => Arc::clone(Process::from_cached(object).unwrap()),
                other => panic!("expected a cached process, got {:?}", other),
            })
            .collect();

        for object in &resolved {
            assert!(Arc::ptr_eq(object, &process));
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut cache = ObjectCache::new();
        cache.register(1, Arc::new(Integer::new(1))).unwrap();

        let err = cache.register(1, Arc::new(Integer::new(2))).unwrap_err();
        assert!(matches!(err, DeserializationError::DuplicateObjectId { id: 1 }));

        let err = cache.register_absent(1).unwrap_err();
        assert!(matches!(err, DeserializationError::DuplicateObjectId { id: 1 }));
    }

    #[test]
    fn test_absent_and_unknown_ids() {
        let mut cache = ObjectCache::new();
        cache.register_absent(3).unwrap();

        assert!(matches!(cache.lookup(3), Lookup::Absent));
        assert!(matches!(cache.lookup(4), Lookup::NotFound));
    }

    #[test]
    fn test_wrong_type_is_not_converted() {
        let mut cache = ObjectCache::new();
        let handle = cache.register(1, Arc::new(Text::new("Running"))).unwrap();
        let object = cache.get(handle).unwrap();

        assert_eq!(object.type_name(), "text");
        assert!(Integer::from_cached(object).is_none());
    }

    #[test]
    fn test_clear_forgets_every_id() {
        let mut cache = ObjectCache::new();
        cache.register(1, Arc::new(Boolean { value: true })).unwrap();
        cache.clear();

        assert!(cache.is_empty());
        assert!(matches!(cache.lookup(1), Lookup::NotFound));
        cache.register(1, Arc::new(Boolean { value: false })).unwrap();
    }
}

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TraceError>;
pub type DeserializationResult<T> = std::result::Result<T, DeserializationError>;

/// Structural errors.
///
/// These indicate that the exporter produced something the decoder does not understand, and
/// are never masked: they abort processing of the current source.
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error("row has {found} columns, but schema `{schema}` declares {expected}")]
    RowColumnMismatch {
        schema: String,
        expected: usize,
        found: usize,
    },

    #[error(
        "`{type_name}` has {expected} positional fields, but <{element}> only has {found} children"
    )]
    MissingChildren {
        type_name: &'static str,
        element: String,
        expected: usize,
        found: usize,
    },

    #[error("object id {id} is already registered in this table")]
    DuplicateObjectId { id: u32 },

    #[error("`{type_name}` has no custom extractor for field `{field}`")]
    UnknownCustomField {
        type_name: &'static str,
        field: &'static str,
    },

    #[error("`{type_name}` has no positional decoder for field `{field}`")]
    UnknownPositionalField {
        type_name: &'static str,
        field: &'static str,
    },

    #[error("`{shape}` has no field bound to column `{name}` ({engineering_type})")]
    UnknownColumn {
        shape: &'static str,
        name: String,
        engineering_type: String,
    },

    #[error("reference to object {id} expects `{expected}`, but the cache holds `{found}`")]
    ReferenceTypeMismatch {
        id: u32,
        expected: &'static str,
        found: &'static str,
    },

    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("failed to parse `{value}` in <{element}> as {expected}")]
    InvalidValue {
        element: String,
        value: String,
        expected: &'static str,
    },

    #[error("<{element}> carries a non-numeric object id `{value}`")]
    InvalidObjectId { element: String, value: String },

    #[error("malformed schema: {message}")]
    MalformedSchema { message: String },
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("an I/O error has occurred: {0}")]
    Io(#[from] io::Error),

    #[error("failed to open file {}: {source}", path.display())]
    FailedToOpenFile { path: PathBuf, source: io::Error },

    #[error("XML reader failed at byte {position}: {source}")]
    Xml {
        position: u64,
        source: quick_xml::Error,
    },

    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    #[error("document ended inside <{element}>")]
    UnexpectedEof { element: String },

    #[error("failed to parse `{source_name}`, caused by:\n\t {source}")]
    FailedToParseSource {
        source_name: String,
        source: Box<TraceError>,
    },
}

impl TraceError {
    pub(crate) fn xml(position: u64, source: impl Into<quick_xml::Error>) -> Self {
        TraceError::Xml {
            position,
            source: source.into(),
        }
    }

    /// The structural error at the root of this error, if any.
    pub fn as_deserialization_error(&self) -> Option<&DeserializationError> {
        match self {
            TraceError::Deserialization(e) => Some(e),
            TraceError::FailedToParseSource { source, .. } => source.as_deserialization_error(),
            _ => None,
        }
    }
}

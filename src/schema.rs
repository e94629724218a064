use serde::Serialize;

use crate::err::{DeserializationError, DeserializationResult};
use crate::model::XmlNode;

/// One `<col>` of a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Column {
    pub mnemonic: Option<String>,
    pub name: String,
    pub engineering_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, engineering_type: impl Into<String>) -> Self {
        Column {
            mnemonic: None,
            name: name.into(),
            engineering_type: engineering_type.into(),
        }
    }
}

/// The inline declaration that precedes the rows of a table:
///
/// ```xml
/// <schema name="time-profile">
///   <col><mnemonic>time</mnemonic><name>Sample Time</name><engineering-type>sample-time</engineering-type></col>
///   ...
/// </schema>
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub name: Option<String>,
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new<I, N, E>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = (N, E)>,
        N: Into<String>,
        E: Into<String>,
    {
        Schema {
            name: Some(name.into()),
            columns: columns
                .into_iter()
                .map(|(name, engineering_type)| Column::new(name, engineering_type))
                .collect(),
        }
    }

    pub fn from_node(node: &XmlNode) -> DeserializationResult<Self> {
        if node.name != "schema" {
            return Err(DeserializationError::MalformedSchema {
                message: format!("expected <schema>, found <{}>", node.name),
            });
        }

        let columns = node
            .children
            .iter()
            .filter(|child| child.name == "col")
            .enumerate()
            .map(|(index, col)| column_from_node(index, col))
            .collect::<DeserializationResult<Vec<_>>>()?;

        Ok(Schema {
            name: node.attribute("name").map(str::to_owned),
            columns,
        })
    }

    /// The schema name, or `<unnamed>` for display purposes.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn column_from_node(index: usize, col: &XmlNode) -> DeserializationResult<Column> {
    let mut mnemonic = None;
    let mut name = None;
    let mut engineering_type = None;

    for child in &col.children {
        let value = child.text.trim().to_owned();
        match child.name.as_str() {
            // Older exports misspell the tag.
            "mnemonic" | "mneumonic" => mnemonic = Some(value),
            "name" => name = Some(value),
            "engineering-type" => engineering_type = Some(value),
            _ => {}
        }
    }

    let missing = |what: &str| DeserializationError::MalformedSchema {
        message: format!("column {} has no <{}>", index, what),
    };

    Ok(Column {
        mnemonic,
        name: name.ok_or_else(|| missing("name"))?,
        engineering_type: engineering_type.ok_or_else(|| missing("engineering-type"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_schema_from_node() {
        let node = XmlNode::parse_str(
            r#"<schema name="syscall-name-map">
                 <col><mnemonic>time</mnemonic><name>Timestamp</name><engineering-type>event-time</engineering-type></col>
                 <col><mnemonic>name</mnemonic><name>Name</name><engineering-type>syscall</engineering-type></col>
                 <note>ignored</note>
               </schema>"#,
        )
        .unwrap();

        let schema = Schema::from_node(&node).unwrap();

        assert_eq!(schema.name.as_deref(), Some("syscall-name-map"));
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.columns[0].mnemonic.as_deref(), Some("time"));
        assert_eq!(schema.columns[1], Column {
            mnemonic: Some("name".to_owned()),
            name: "Name".to_owned(),
            engineering_type: "syscall".to_owned(),
        });
    }

    #[test]
    fn test_column_without_engineering_type_is_malformed() {
        let node = XmlNode::parse_str(
            "<schema name=\"x\"><col><name>Timestamp</name></col></schema>",
        )
        .unwrap();

        let err = Schema::from_node(&node).unwrap_err();
        assert!(matches!(err, DeserializationError::MalformedSchema { .. }), "{:?}", err);
    }

    #[test]
    fn test_schema_without_columns() {
        let schema = Schema::from_node(&XmlNode::new("schema")).unwrap();
        assert!(schema.is_empty());
        assert_eq!(schema.display_name(), "<unnamed>");
    }
}

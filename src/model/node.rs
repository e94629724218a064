use std::borrow::Cow;
use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::err::{DeserializationError, DeserializationResult, Result, TraceError};

pub(crate) const SENTINEL: &str = "sentinel";

/// An owned element of the exported document.
///
/// Rows are small, so each `<row>` (and each `<schema>`) is materialized into one of these
/// while the rest of the document is only ever seen as a token stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        XmlNode {
            name: name.into(),
            ..XmlNode::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn required_attribute(&self, key: &'static str) -> DeserializationResult<&str> {
        self.attribute(key)
            .ok_or_else(|| DeserializationError::MissingAttribute {
                element: self.name.clone(),
                attribute: key,
            })
    }

    pub fn child(&self, index: usize) -> Option<&XmlNode> {
        self.children.get(index)
    }

    /// `<sentinel/>` stands in for a column (or sub-position) with no value.
    pub fn is_sentinel(&self) -> bool {
        self.name == SENTINEL
    }

    /// The id this position points back at (`ref="N"`), if it is a reference.
    pub fn reference_id(&self) -> DeserializationResult<Option<u32>> {
        self.object_id("ref")
    }

    /// The id this position defines (`id="N"`), if any.
    pub fn definition_id(&self) -> DeserializationResult<Option<u32>> {
        self.object_id("id")
    }

    fn object_id(&self, key: &str) -> DeserializationResult<Option<u32>> {
        match self.attribute(key) {
            None => Ok(None),
            Some(value) => value.trim().parse::<u32>().map(Some).map_err(|_| {
                DeserializationError::InvalidObjectId {
                    element: self.name.clone(),
                    value: value.to_owned(),
                }
            }),
        }
    }

    /// Parses a standalone XML snippet into a node tree.
    pub fn parse_str(xml: &str) -> Result<XmlNode> {
        let mut reader = Reader::from_reader(xml.as_bytes());
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut scratch = Vec::new();

        loop {
            match read_event(&mut reader, &mut buf)? {
                Event::Start(start) => {
                    let node = XmlNode::from_start(&start, reader.buffer_position())?;
                    return node.read_children(&mut reader, &mut scratch);
                }
                Event::Empty(start) => {
                    return XmlNode::from_start(&start, reader.buffer_position());
                }
                Event::Eof => {
                    return Err(TraceError::UnexpectedEof {
                        element: "<document>".to_owned(),
                    });
                }
                _ => {}
            }
            buf.clear();
        }
    }

    /// Builds a childless node from a start (or empty) tag.
    pub(crate) fn from_start(start: &BytesStart<'_>, position: u64) -> Result<XmlNode> {
        let mut node = XmlNode::new(decode_name(start.name().as_ref()));

        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| TraceError::xml(position, e))?;
            let value = attribute
                .unescape_value()
                .map_err(|e| TraceError::xml(position, e))?;

            node.attributes.push((
                decode_name(attribute.key.as_ref()).into_owned(),
                value.into_owned(),
            ));
        }

        Ok(node)
    }

    /// Consumes events up to and including the end tag matching `self`, attaching every nested
    /// element and text run to the tree.
    pub(crate) fn read_children<R: BufRead>(
        self,
        reader: &mut Reader<R>,
        buf: &mut Vec<u8>,
    ) -> Result<XmlNode> {
        let mut stack = vec![self];

        loop {
            buf.clear();
            match read_event(reader, buf)? {
                Event::Start(start) => {
                    stack.push(XmlNode::from_start(&start, reader.buffer_position())?);
                }
                Event::Empty(start) => {
                    let child = XmlNode::from_start(&start, reader.buffer_position())?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(child);
                    }
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| TraceError::xml(reader.buffer_position(), e))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::End(_) => {
                    // Tag names are checked by the reader, so this closes the innermost node.
                    if let Some(done) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(done),
                            None => return Ok(done),
                        }
                    }
                }
                Event::Eof => {
                    let element = stack
                        .last()
                        .map(|n| n.name.clone())
                        .unwrap_or_default();
                    return Err(TraceError::UnexpectedEof { element });
                }
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }
    }
}

pub(crate) fn read_event<'b, R: BufRead>(
    reader: &mut Reader<R>,
    buf: &'b mut Vec<u8>,
) -> Result<Event<'b>> {
    reader
        .read_event_into(buf)
        .map_err(|e| TraceError::xml(reader.buffer_position(), e))
}

pub(crate) fn decode_name(name: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_row_into_tree() {
        let row = XmlNode::parse_str(
            r#"<row>
                 <start-time id="1" fmt="00:00.000.001">1000</start-time>
                 <thread id="2" fmt="Main Thread 0x1 (App, pid: 7)">
                   <tid id="3" fmt="0x1">1</tid>
                   <process ref="4"/>
                 </thread>
                 <sentinel/>
                 <narrative fmt="a &amp; b"/>
               </row>"#,
        )
        .unwrap();

        assert_eq!(row.name, "row");
        assert_eq!(row.children.len(), 4);

        let start = &row.children[0];
        assert_eq!(start.text, "1000");
        assert_eq!(start.definition_id().unwrap(), Some(1));
        assert_eq!(start.reference_id().unwrap(), None);

        let thread = &row.children[1];
        assert_eq!(thread.children.len(), 2);
        assert_eq!(thread.children[1].reference_id().unwrap(), Some(4));

        assert!(row.children[2].is_sentinel());
        assert_eq!(row.children[3].attribute("fmt"), Some("a & b"));
    }

    #[test]
    fn test_non_numeric_id_is_an_error() {
        let node = XmlNode::new("process").with_attribute("ref", "four");
        assert!(matches!(
            node.reference_id(),
            Err(DeserializationError::InvalidObjectId { .. })
        ));
    }

    #[test]
    fn test_unterminated_snippet_is_an_error() {
        let err = XmlNode::parse_str("<row><thread id=\"1\">").unwrap_err();
        assert!(
            matches!(err, TraceError::UnexpectedEof { .. } | TraceError::Xml { .. }),
            "{:?}",
            err
        );
    }
}

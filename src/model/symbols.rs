use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::deserializer::{Deserializer, FieldDescriptor, TraceObject};
use crate::err::DeserializationResult;
use crate::model::XmlNode;

const UNKNOWN_SYMBOL: &str = "NA";

/// `<binary name=".." UUID=".." arch=".." load-addr=".." path=".."/>`
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub name: String,
    pub uuid: Option<String>,
    pub arch: Option<String>,
    pub load_address: Option<String>,
    pub path: Option<String>,
}

impl TraceObject for Module {
    const TYPE_NAME: &'static str = "module";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::custom("name"),
        FieldDescriptor::custom("uuid"),
        FieldDescriptor::custom("arch"),
        FieldDescriptor::custom("load_address"),
        FieldDescriptor::custom("path"),
    ];

    fn decode_custom(
        &mut self,
        field: &'static str,
        node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        let optional = |key: &str| node.attribute(key).map(str::to_owned);

        match field {
            "name" => self.name = node.required_attribute("name")?.to_owned(),
            "uuid" => self.uuid = optional("UUID"),
            "arch" => self.arch = optional("arch"),
            "load_address" => self.load_address = optional("load-addr"),
            "path" => self.path = optional("path"),
            _ => return de.unknown_custom_field::<Self>(field),
        }
        Ok(())
    }
}

/// Symbol information carried on a `<frame>` itself.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// `<frame name="symbol" addr="0x..."><binary .../></frame>`
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub function: Function,
    pub module: Option<Arc<Module>>,
}

impl TraceObject for Frame {
    const TYPE_NAME: &'static str = "frame";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::custom("function"),
        FieldDescriptor::positional("module"),
    ];

    fn decode_custom(
        &mut self,
        field: &'static str,
        node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        match field {
            "function" => {
                self.function = Function {
                    name: node.attribute("name").map(str::to_owned),
                    address: node.attribute("addr").map(str::to_owned),
                };
            }
            _ => return de.unknown_custom_field::<Self>(field),
        }
        Ok(())
    }

    fn decode_positional(
        &mut self,
        field: &'static str,
        node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        match field {
            "module" => self.module = de.decode(Some(node))?,
            _ => return de.unknown_positional_field::<Self>(field),
        }
        Ok(())
    }
}

impl Frame {
    /// `module!function`, with `NA` standing in for whichever half is unknown.
    pub fn symbol(&self) -> String {
        let module = self
            .module
            .as_ref()
            .map(|m| m.name.as_str())
            .unwrap_or(UNKNOWN_SYMBOL);
        let function = self.function.name.as_deref().unwrap_or(UNKNOWN_SYMBOL);

        format!("{}!{}", module, function)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol())
    }
}

/// `<backtrace><frame/>...</backtrace>`, innermost frame first.
///
/// Frames that resolve to nothing (an unresolved reference, or a frame without its module)
/// are kept as `None` so positions in the stack are preserved.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Backtrace {
    pub frames: Vec<Option<Arc<Frame>>>,
}

impl TraceObject for Backtrace {
    const TYPE_NAME: &'static str = "backtrace";
    const FIELDS: &'static [FieldDescriptor] = &[FieldDescriptor::custom("frames")];

    fn decode_custom(
        &mut self,
        field: &'static str,
        node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        match field {
            "frames" => {
                self.frames = node
                    .children
                    .iter()
                    .map(|child| de.decode::<Frame>(Some(child)))
                    .collect::<DeserializationResult<_>>()?;
            }
            _ => return de.unknown_custom_field::<Self>(field),
        }
        Ok(())
    }
}

impl Backtrace {
    /// The stack rendered as `module!function` strings, innermost first.
    pub fn symbols(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|frame| match frame {
                Some(frame) => frame.symbol(),
                None => format!("{}!{}", UNKNOWN_SYMBOL, UNKNOWN_SYMBOL),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deserializer::test_utils::decode_standalone;
    use crate::err::DeserializationError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_backtrace_resolves_repeated_frames() {
        let node = XmlNode::parse_str(
            r#"<backtrace id="1">
                 <frame id="2" name="main" addr="0x100003f20">
                   <binary id="3" name="Demo" UUID="0D3F" arch="arm64" load-addr="0x100000000" path="/tmp/Demo"/>
                 </frame>
                 <frame id="4" name="start" addr="0x18f5a0e0c">
                   <binary id="5" name="dyld" UUID="AA11" arch="arm64e"/>
                 </frame>
                 <frame ref="2"/>
                 <frame id="6" name="orphan" addr="0x1"/>
               </backtrace>"#,
        )
        .unwrap();

        let backtrace = decode_standalone::<Backtrace>(&node).unwrap().unwrap();

        assert_eq!(backtrace.len(), 4);
        assert_eq!(
            backtrace.symbols(),
            vec!["Demo!main", "dyld!start", "Demo!main", "NA!NA"]
        );
        assert!(Arc::ptr_eq(
            backtrace.frames[0].as_ref().unwrap(),
            backtrace.frames[2].as_ref().unwrap()
        ));

        let demo = backtrace.frames[0].as_ref().unwrap().module.as_ref().unwrap();
        assert_eq!(demo.uuid.as_deref(), Some("0D3F"));
        assert_eq!(demo.load_address.as_deref(), Some("0x100000000"));
        assert_eq!(demo.path.as_deref(), Some("/tmp/Demo"));
    }

    #[test]
    fn test_module_requires_a_name() {
        let node = XmlNode::new("binary").with_attribute("UUID", "0D3F");
        let err = decode_standalone::<Module>(&node).unwrap_err();

        assert!(
            matches!(err, DeserializationError::MissingAttribute { attribute: "name", .. }),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_frame_symbol_with_unknown_function() {
        let frame = Frame {
            function: Function::default(),
            module: Some(Arc::new(Module {
                name: "libsystem_kernel.dylib".to_owned(),
                ..Module::default()
            })),
        };

        assert_eq!(frame.symbol(), "libsystem_kernel.dylib!NA");
    }
}

use std::sync::Arc;

use serde::Serialize;

use crate::deserializer::{Deserializer, FieldDescriptor, TraceObject};
use crate::err::DeserializationResult;
use crate::model::{Integer, Text, XmlNode};

/// `<process fmt="Name (pid)"><pid>..</pid><device-session>..</device-session></process>`
///
/// Every field is custom: the children are optional, so a bare `<process/>` still decodes.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    pub pid: Option<Arc<Integer>>,
    pub name: Option<String>,
    pub device_session: Option<Arc<Text>>,
}

impl TraceObject for Process {
    const TYPE_NAME: &'static str = "process";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::custom("pid"),
        FieldDescriptor::custom("name"),
        FieldDescriptor::custom("device_session"),
    ];

    fn decode_custom(
        &mut self,
        field: &'static str,
        node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        match field {
            "pid" => self.pid = de.decode(node.child(0))?,
            "name" => self.name = node.attribute("fmt").map(str::to_owned),
            "device_session" => self.device_session = de.decode(node.child(1))?,
            _ => return de.unknown_custom_field::<Self>(field),
        }
        Ok(())
    }
}

impl Process {
    pub fn pid(&self) -> Option<i64> {
        self.pid.as_ref().map(|pid| pid.value)
    }
}

/// `<thread fmt="..."><tid>..</tid><process>..</process></thread>`
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Thread {
    pub name: Option<String>,
    pub tid: Option<Arc<Integer>>,
    pub process: Option<Arc<Process>>,
}

impl TraceObject for Thread {
    const TYPE_NAME: &'static str = "thread";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::custom("name"),
        FieldDescriptor::positional("tid"),
        FieldDescriptor::positional("process"),
    ];

    fn decode_custom(
        &mut self,
        field: &'static str,
        node: &XmlNode,
        de: &mut Deserializer<'_>,
    ) -> DeserializationResult<()> {
        match field {
            "name" => self.name = node.attribute("fmt").map(str::to_owned),
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
            "tid" => self.tid = de.decode(Some(node))?,
            "process" => self.process = de.decode(Some(node))?,
            _ => return de.unknown_positional_field::<Self>(field),
        }
        Ok(())
    }
}

impl Thread {
    pub fn tid(&self) -> Option<i64> {
        self.tid.as_ref().map(|tid| tid.value)
    }

    pub fn pid(&self) -> Option<i64> {
        self.process.as_ref().and_then(|p| p.pid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deserializer::test_utils::decode_standalone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_thread_with_nested_process() {
        let node = XmlNode::parse_str(
            r#"<thread id="2" fmt="Main Thread 0x2a (Demo, pid: 99)">
                 <tid id="3" fmt="0x2a">42</tid>
                 <process id="4" fmt="Demo (99)">
                   <pid id="5" fmt="99">99</pid>
                   <device-session id="6" fmt="session-1">1</device-session>
                 </process>
               </thread>"#,
        )
        .unwrap();

        let thread = decode_standalone::<Thread>(&node).unwrap().unwrap();

        assert_eq!(thread.name.as_deref(), Some("Main Thread 0x2a (Demo, pid: 99)"));
        assert_eq!(thread.tid(), Some(42));
        assert_eq!(thread.pid(), Some(99));

        let process = thread.process.as_ref().unwrap();
        assert_eq!(process.name.as_deref(), Some("Demo (99)"));
        assert_eq!(
            process.device_session.as_ref().map(|s| s.as_str()),
            Some("session-1")
        );
    }

    #[test]
    fn test_process_without_children() {
        let node = XmlNode::new("process").with_attribute("fmt", "kernel_task (0)");
        let process = decode_standalone::<Process>(&node).unwrap().unwrap();

        assert_eq!(process.name.as_deref(), Some("kernel_task (0)"));
        assert_eq!(process.pid, None);
        assert_eq!(process.device_session, None);
    }
}

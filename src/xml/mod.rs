//! XML projection of evaluated output.
//!
//! Every entry becomes a child of a single `<config>` root. The element tag
//! is the value's shape (`number`, `array` or `dict`) and the entry name is
//! carried in a `name` attribute. Array elements are all named `item`; dict
//! children are named by their key.
//!
//! ```rust
//! let xml = constxml::render("const a = 1.5 array(2.0)").unwrap();
//! assert_eq!(
//!     xml,
//!     r#"<config><number name="a">1.5</number><array name="value1"><number name="item">2.0</number></array></config>"#
//! );
//! ```

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use tracing::trace;

use crate::ast::value::{Value, format_number};
use crate::error::XmlError;
use crate::eval::Output;

const ROOT: &str = "config";
const ITEM: &str = "item";

/// Render evaluated output as an XML document string (no declaration header).
pub fn to_xml(output: &Output) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());

    if output.is_empty() {
        write_event(&mut writer, Event::Empty(BytesStart::new(ROOT)))?;
    } else {
        write_event(&mut writer, Event::Start(BytesStart::new(ROOT)))?;
        for entry in output {
            write_value(&mut writer, &entry.display_name(), &entry.value)?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new(ROOT)))?;
    }

    let bytes = writer.into_inner();
    trace!(bytes = bytes.len(), "xml written");
    String::from_utf8(bytes).map_err(|e| XmlError(e.to_string()))
}

fn write_value(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), XmlError> {
    let tag = value.type_name();
    let mut start = BytesStart::new(tag);
    start.push_attribute(("name", name));

    match value {
        Value::Number(n) => {
            let text = format_number(*n);
            write_event(writer, Event::Start(start))?;
            write_event(writer, Event::Text(BytesText::new(&text)))?;
            write_event(writer, Event::End(BytesEnd::new(tag)))
        }
        Value::Array(items) if items.is_empty() => write_event(writer, Event::Empty(start)),
        Value::Array(items) => {
            write_event(writer, Event::Start(start))?;
            for item in items {
                write_value(writer, ITEM, item)?;
            }
            write_event(writer, Event::End(BytesEnd::new(tag)))
        }
        Value::Dict(dict) if dict.is_empty() => write_event(writer, Event::Empty(start)),
        Value::Dict(dict) => {
            write_event(writer, Event::Start(start))?;
            for (key, child) in dict.iter() {
                write_value(writer, key, child)?;
            }
            write_event(writer, Event::End(BytesEnd::new(tag)))
        }
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError(e.to_string()))
}

/// Small event-writer wrapper for the XML parts of a package
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{ExportError, ExportResult};

/// An indented XML document under construction
pub struct XmlDoc {
    writer: Writer<Vec<u8>>,
}

impl XmlDoc {
    /// Start a document with the UTF-8 XML declaration
    pub fn new() -> ExportResult<Self> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(Self { writer })
    }

    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> ExportResult<()> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> ExportResult<()> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(start))?;
        Ok(())
    }

    pub fn close(&mut self, name: &str) -> ExportResult<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// `<name attrs>text</name>`, text escaped
    pub fn text(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> ExportResult<()> {
        self.open(name, attrs)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    pub fn finish(self) -> ExportResult<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| ExportError::serialization(format!("invalid UTF-8 in generated XML: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_attributes_and_text() {
        let mut doc = XmlDoc::new().unwrap();
        doc.open("root", &[("name", "a<b&\"c\"")]).unwrap();
        doc.text("metadata", &[], "x & y").unwrap();
        doc.empty("leaf", &[]).unwrap();
        doc.close("root").unwrap();
        let xml = doc.finish().unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("a&lt;b&amp;&quot;c&quot;"));
        assert!(xml.contains("<metadata>x &amp; y</metadata>"));
        assert!(xml.contains("<leaf/>"));
        assert!(xml.trim_end().ends_with("</root>"));
    }
}

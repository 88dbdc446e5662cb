//! XML dictionary reader (define.xml-like and ad hoc element layouts).

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{DictionaryParser, DictionarySource, is_required_flag};
use crate::error::{CodebookError, Result};
use crate::schema::{Choice, DataDictionary, FieldDescriptor, FieldType, SourceFormat};

/// Element names that hold one field each, in priority order.
const FIELD_TAGS: &[&str] = &["field", "variable", "column", "item"];
const NAME_ATTRS: &[&str] = &["name", "Name", "OID"];
const NAME_TAGS: &[&str] = &["name", "Name"];
const LABEL_TAGS: &[&str] = &["label", "Label", "description", "Description"];
const DESCRIPTION_TAGS: &[&str] = &["description", "Description"];
const TYPE_TAGS: &[&str] = &["type", "Type", "DataType", "datatype"];
const CODELIST_TAGS: &[&str] = &["CodeList", "codelist"];
const CODE_ITEM_TAGS: &[&str] = &["CodeListItem", "item"];
const CODE_VALUE_ATTRS: &[&str] = &["CodedValue", "value"];
const DECODE_TAGS: &[&str] = &["Decode", "decode"];

/// Minimal element tree; names are local (namespace prefixes dropped).
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| CodebookError::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| CodebookError::Xml(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn attr(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| {
            self.attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
                .filter(|value| !value.trim().is_empty())
        })
    }

    /// All descendants (not self) with the given name, in document order.
    fn descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.descendants(name, out);
        }
    }

    fn find_all(&self, names: &[&str]) -> Vec<&Element> {
        let mut found = Vec::new();
        for name in names {
            self.descendants(name, &mut found);
        }
        found
    }

    /// First descendant matching the highest-priority name present.
    fn find_first(&self, names: &[&str]) -> Option<&Element> {
        names.iter().find_map(|name| {
            let mut found = Vec::new();
            self.descendants(name, &mut found);
            found.into_iter().next()
        })
    }

    /// Concatenated text of this element and its descendants.
    fn full_text(&self) -> String {
        let mut text = self.text.clone();
        for child in &self.children {
            text.push_str(&child.full_text());
        }
        text.trim().to_string()
    }
}

/// Parses XML data dictionaries.
pub struct XmlDictionaryParser;

impl DictionaryParser for XmlDictionaryParser {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn parse(&self, source: &DictionarySource) -> Result<DataDictionary> {
        let root = read_tree(&source.content)?;
        let mut dictionary = DataDictionary::new(&source.name, SourceFormat::Xml);

        let elements = FIELD_TAGS
            .iter()
            .map(|tag| {
                let mut found = Vec::new();
                root.descendants(tag, &mut found);
                found
            })
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        for element in elements {
            if let Some(field) = build_field(element) {
                dictionary.add_field(field);
            }
        }

        Ok(dictionary)
    }
}

fn build_field(element: &Element) -> Option<FieldDescriptor> {
    let name = element
        .attr(NAME_ATTRS)
        .map(|s| s.trim().to_string())
        .or_else(|| element.find_first(NAME_TAGS).map(Element::full_text))
        .filter(|name| !name.is_empty())?;

    let mut field = FieldDescriptor::new(name, FieldType::Unknown);

    if let Some(label) = element.find_first(LABEL_TAGS) {
        field.label = label.full_text();
    }
    if let Some(description) = element.find_first(DESCRIPTION_TAGS) {
        field.description = description.full_text();
    }

    let type_name = element
        .find_first(TYPE_TAGS)
        .map(Element::full_text)
        .or_else(|| element.attr(&["type", "DataType"]).map(str::to_string));
    if let Some(type_name) = type_name {
        field.field_type = FieldType::from_source_name(&type_name);
    }

    if let Some(flag) = element.attr(&["required", "Mandatory"]) {
        field.required = is_required_flag(flag);
    }

    for codelist in element.find_all(CODELIST_TAGS) {
        for item in codelist.find_all(CODE_ITEM_TAGS) {
            let Some(code) = item.attr(CODE_VALUE_ATTRS) else {
                continue;
            };
            let label = item
                .find_first(DECODE_TAGS)
                .map(Element::full_text)
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| code.to_string());
            field.choices.push(Choice::new(code, label));
        }
    }

    Some(field.finalize())
}

fn read_tree(content: &str) -> Result<Element> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    // Synthetic document node so the real root is searchable as a descendant.
    let mut stack = vec![Element::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(Element::from_start(&start)?),
            Ok(Event::Empty(start)) => {
                let element = Element::from_start(&start)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|e| CodebookError::Xml(e.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(CodebookError::Xml("unexpected closing tag".to_string()));
                }
                if let Some(finished) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(finished);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(CodebookError::Xml(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if stack.len() != 1 {
        return Err(CodebookError::Xml("document ended inside an open element".to_string()));
    }
    let document = stack.pop().unwrap_or_default();
    if document.children.is_empty() {
        return Err(CodebookError::Xml("document has no root element".to_string()));
    }

    Ok(document)
}

//! Projection of an XML document onto the canonical value tree.
//!
//! The document element becomes the single key of the top-level mapping.
//! Attributes are keyed `-name`, repeated child elements collect into a
//! sequence and text next to attributes or children is keyed `#text`.
use roxmltree::{Document, Node, ParsingOptions};
use crate::value::{Mapping, Value};

const ATTRIBUTE_PREFIX: &str = "-";
const TEXT_KEY: &str = "#text";


pub(crate) fn xml_mapping(text: &str) -> Result<Mapping, String> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let document = Document::parse_with_options(text, options).map_err(|err| err.to_string())?;
    let root = document.root_element();
    let mut mapping = Mapping::new();
    mapping.insert(root.tag_name().name().to_owned(), element(root));
    Ok(mapping)
}

fn element(node: Node) -> Value {
    let has_children = node.children().any(|child| child.is_element());
    if !has_children && node.attributes().next().is_none() {
        return Value::String(text_of(node));
    }

    let mut mapping = Mapping::new();
    for attribute in node.attributes() {
        mapping.insert(
            format!("{}{}", ATTRIBUTE_PREFIX, attribute.name()),
            Value::String(attribute.value().to_owned())
        );
    }
    for child in node.children().filter(|child| child.is_element()) {
        let name = child.tag_name().name().to_owned();
        let value = element(child);
        match mapping.get_mut(&name) {
            Some(Value::Array(seq)) => seq.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            },
            None => {
                mapping.insert(name, value);
            }
        }
    }
    let text = text_of(node);
    if !text.is_empty() {
        mapping.insert(TEXT_KEY.to_owned(), Value::String(text));
    }
    Value::Object(mapping)
}

fn text_of(node: Node) -> String {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect::<String>()
        .trim()
        .to_owned()
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_elements_are_text() {
        let mapping = xml_mapping("<doc><name> helm </name><empty/></doc>").unwrap();
        assert_eq!(Value::Object(mapping), json!({"doc": {"name": "helm", "empty": ""}}));
    }

    #[test]
    fn attributes_and_text() {
        let mapping = xml_mapping(r#"<doc version="2"><title lang="en">Hello</title></doc>"#).unwrap();
        assert_eq!(
            Value::Object(mapping),
            json!({"doc": {"-version": "2", "title": {"-lang": "en", "#text": "Hello"}}})
        );
    }

    #[test]
    fn repeated_children_collect() {
        let mapping = xml_mapping("<list><item>a</item><item>b</item><item>c</item></list>").unwrap();
        assert_eq!(Value::Object(mapping), json!({"list": {"item": ["a", "b", "c"]}}));
    }

    #[test]
    fn namespaces_and_comments_are_dropped() {
        let text = r#"<?xml version="1.0"?>
            <x:root xmlns:x="urn:test"><!-- note --><x:leaf>1</x:leaf></x:root>"#;
        let mapping = xml_mapping(text).unwrap();
        assert_eq!(Value::Object(mapping), json!({"root": {"leaf": "1"}}));
    }

    #[test]
    fn doctype_is_accepted() {
        let mapping = xml_mapping("<!DOCTYPE note><note><a>1</a></note>").unwrap();
        assert_eq!(Value::Object(mapping), json!({"note": {"a": "1"}}));
        let text = r#"<?xml version="1.0"?>
            <!DOCTYPE note [<!ENTITY who "world">]><note>hello &who;</note>"#;
        assert_eq!(Value::Object(xml_mapping(text).unwrap()), json!({"note": "hello world"}));
    }

    #[test]
    fn malformed_is_error() {
        assert!(xml_mapping("<open>").is_err());
    }
}

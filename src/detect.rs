//! Format detection: one look at the first character, one parse.
use std::str;
use log::debug;
use crate::error::Error;
use crate::value::{self, Mapping, Value};
use crate::xml;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Xml,
    Yaml,
}

impl DataFormat {
    /// Classifies trimmed, non-empty input by its first character.
    pub fn sniff(text: &str) -> Option<Self> {
        match text.chars().next()? {
            '{' => Some(DataFormat::Json),
            '<' => Some(DataFormat::Xml),
            _ => Some(DataFormat::Yaml),
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(DataFormat::Json),
            "xml" => Some(DataFormat::Xml),
            "yml" | "yaml" => Some(DataFormat::Yaml),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataFormat::Json => "JSON",
            DataFormat::Xml => "XML",
            DataFormat::Yaml => "YAML",
        }
    }

    /// Parses `text` as this format; the result must be a mapping.
    pub fn parse(&self, text: &str) -> Result<Value, Error> {
        let mapping = match self {
            DataFormat::Json => json_mapping(text),
            DataFormat::Xml => xml::xml_mapping(text),
            DataFormat::Yaml => value::yaml_mapping(text),
        };
        mapping
            .map(Value::Object)
            .map_err(|message| Error::data_format(
                format!("invalid {} data: {}", self.name(), message)
            ))
    }
}


/// Detects the format of `raw` and parses it into a canonical mapping.
pub fn detect_and_parse(raw: impl AsRef<[u8]>) -> Result<Value, Error> {
    let text = str::from_utf8(raw.as_ref())
        .map_err(|err| Error::data_format(format!("data is not valid UTF-8: {}", err)))?
        .trim();
    let format = DataFormat::sniff(text)
        .ok_or_else(|| Error::data_format("no data provided"))?;
    debug!("detected {} data ({} bytes)", format.name(), text.len());
    format.parse(text)
}


fn json_mapping(text: &str) -> Result<Mapping, String> {
    match serde_json::from_str::<Value>(text).map_err(|err| err.to_string())? {
        Value::Object(map) => Ok(map),
        other => Err(format!("cannot unmarshal {} into a mapping", json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

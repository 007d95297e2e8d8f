use serde::{Deserialize, Serialize};

/// Represents an extra key-value pair in CKAN datasets
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extra {
    #[serde(rename = "key")]
    pub key: String,
    #[serde(rename = "value")]
    pub value: serde_json::Value,
}

impl Extra {
    /// The value as display text: strings verbatim, null as empty, anything else as JSON.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Collapse a list of extras into unique keys.
///
/// Keys keep the position of their first occurrence and the value of their
/// last one, which is how the catalog's own dict-based consumers see them.
pub fn unique_extras(extras: &[Extra]) -> Vec<(&str, String)> {
    let mut unique: Vec<(&str, String)> = Vec::with_capacity(extras.len());
    for extra in extras {
        let value = extra.value_text();
        match unique.iter_mut().find(|(key, _)| *key == extra.key) {
            Some(slot) => slot.1 = value,
            None => unique.push((extra.key.as_str(), value)),
        }
    }
    unique
}

/// Look up an extra by key; the last occurrence wins.
pub fn find_extra(extras: &[Extra], key: &str) -> Option<String> {
    extras
        .iter()
        .rev()
        .find(|extra| extra.key == key)
        .map(Extra::value_text)
}

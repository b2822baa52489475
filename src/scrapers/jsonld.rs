//! Metadata from `<script type="application/ld+json">` blocks.
//!
//! Objects are collected from top-level values, arrays and `@graph` lists so
//! callers can look fields up without caring how a site nests them.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

static LD_JSON: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[type='application/ld+json']").expect("static selector"));

/// Every JSON-LD object on the page, flattened.
pub fn objects(document: &Html) -> Vec<Value> {
    let mut out = Vec::new();
    for script in document.select(&LD_JSON) {
        let raw = script.text().collect::<String>();
        if let Ok(json) = serde_json::from_str::<Value>(raw.trim()) {
            flatten(json, &mut out);
        }
    }
    out
}

fn flatten(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| flatten(item, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten(graph, out);
            }
            out.push(Value::Object(map));
        }
        _ => {}
    }
}

/// Author names from `author` fields (object, array or plain string).
pub fn authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();
    for object in objects(document) {
        match object.get("author") {
            Some(Value::Array(arr)) => {
                for author in arr {
                    if let Some(name) = name_of(author) {
                        authors.push(name);
                    }
                }
            }
            Some(author) => {
                if let Some(name) = name_of(author) {
                    authors.push(name);
                }
            }
            None => {}
        }
    }
    authors
}

fn name_of(author: &Value) -> Option<String> {
    match author {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(|n| n.trim().to_string()),
        _ => None,
    }
    .filter(|name| !name.is_empty())
}

/// First `datePublished` value on the page.
pub fn date_published(document: &Html) -> Option<String> {
    objects(document).iter().find_map(|object| {
        object
            .get("datePublished")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
    })
}

/// `keywords` as a list, whether given as an array or a comma-separated string.
pub fn keywords(document: &Html) -> Vec<String> {
    let mut keywords = Vec::new();
    for object in objects(document) {
        match object.get("keywords") {
            Some(Value::Array(arr)) => keywords.extend(
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(|k| k.trim().to_string()),
            ),
            Some(Value::String(s)) => keywords.extend(s.split(',').map(|k| k.trim().to_string())),
            _ => {}
        }
    }
    keywords
}

//! Response-shape matchers.
//!
//! Catalog APIs return one of three shapes. Each matcher is a pure function
//! that either recognises the body and returns its resources, or declines.
//! Matchers are tried in priority order; the first one that recognises the
//! body wins. A body no matcher recognises yields an empty list, not an error.

use mw_schemas::{CreatedAt, Resource};
use serde_json::{Map, Value};
use tracing::debug;

/// `(shape name, matcher)`. The second argument is the source's display name,
/// used where a shape carries no owner of its own.
pub type ShapeMatcher = fn(&Value, &str) -> Option<Vec<Resource>>;

pub const SHAPES: &[(&str, ShapeMatcher)] = &[
    ("data_list", data_list),
    ("models_list", models_list),
    ("bare_list", bare_list),
];

/// Normalise a decoded body into resources using the first matching shape.
pub fn normalize(body: &Value, source_name: &str) -> Vec<Resource> {
    for (shape, matcher) in SHAPES {
        if let Some(resources) = matcher(body, source_name) {
            debug!(shape = *shape, count = resources.len(), "response shape matched");
            return resources;
        }
    }
    debug!("no response shape matched; treating as empty catalog");
    Vec::new()
}

/// `{"data": [{"id", "created", "owned_by"}]}` (OpenAI-compatible).
pub fn data_list(body: &Value, _source_name: &str) -> Option<Vec<Resource>> {
    let items = body.get("data")?.as_array()?;
    Some(map_objects(items, |o| {
        let id = first_str(o, &["id"])?;
        Some(Resource {
            name: id.clone(),
            id,
            created_at: first_created(o, &["created"]),
            owner: first_str(o, &["owned_by"]),
        })
    }))
}

/// `{"models": [{"model_id"|"id", "display_name"|"name", "created_at"}]}`.
pub fn models_list(body: &Value, source_name: &str) -> Option<Vec<Resource>> {
    let items = body.get("models")?.as_array()?;
    Some(map_objects(items, |o| {
        let id = first_str(o, &["model_id", "id"])?;
        let name = first_str(o, &["display_name", "name", "model_id", "id"]).unwrap_or_else(|| id.clone());
        Some(Resource {
            id,
            name,
            created_at: first_created(o, &["created_at", "created"]),
            owner: Some(source_name.to_string()),
        })
    }))
}

/// `[{"id"|"model_id"|"name", ...}]` at the top level.
pub fn bare_list(body: &Value, source_name: &str) -> Option<Vec<Resource>> {
    let items = body.as_array()?;
    Some(map_objects(items, |o| {
        let id = first_str(o, &["id", "model_id", "name"])?;
        let name = first_str(o, &["name", "model_name", "id"]).unwrap_or_else(|| id.clone());
        Some(Resource {
            id,
            name,
            created_at: first_created(o, &["created", "created_at"]),
            owner: Some(first_str(o, &["owned_by"]).unwrap_or_else(|| source_name.to_string())),
        })
    }))
}

/// Apply `f` to every object element; non-objects and elements without an
/// identity are dropped (they cannot take part in diffing).
fn map_objects<F>(items: &[Value], f: F) -> Vec<Resource>
where
    F: Fn(&Map<String, Value>) -> Option<Resource>,
{
    items
        .iter()
        .filter_map(|v| {
            let r = v.as_object().and_then(&f);
            if r.is_none() {
                debug!("skipping catalog entry without usable id");
            }
            r
        })
        .collect()
}

/// First key holding a non-empty string (numbers are stringified).
fn first_str(o: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match o.get(*k)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_created(o: &Map<String, Value>, keys: &[&str]) -> Option<CreatedAt> {
    keys.iter().find_map(|k| o.get(*k).and_then(CreatedAt::from_json))
}

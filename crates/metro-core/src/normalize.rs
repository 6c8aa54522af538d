//! Load arbitrary map JSON into a canonical [`MapDocument`].
//!
//! Accepted shapes, first match wins:
//!
//! 1. canonical: at least one of `metro_map`, `suburban_map`,
//!    `rivertram_map`, `tram_map` present;
//! 2. a root `lines` array, wrapped into an implicit `metro_map`;
//! 3. legacy aliases `metromap_1`, `metro_map_1`, `metromap`;
//! 4. the first nested object (depth ≤ 4) carrying a `lines` array.
//!
//! Loading never fails: anything else yields the empty skeleton plus a
//! [`MapError`] notice for the host to display.

use crate::error::MapError;
use crate::id::Id;
use crate::model::{MapDocument, SectionKind};
use serde_json::{Map, Value};

/// Travel time used when a transfer carries no numeric `time`.
pub const DEFAULT_TRANSFER_TIME: f64 = 3.0;

const LEGACY_ALIASES: [&str; 3] = ["metromap_1", "metro_map_1", "metromap"];
const CARRIER_MAX_DEPTH: usize = 4;
const SECTION_FIELDS: [&str; 5] = ["lines", "transfers", "intermediatePoints", "rivers", "objects"];

/// Result of a load: always a usable document, plus an optional notice.
#[derive(Debug)]
pub struct LoadOutcome {
    pub document: MapDocument,
    pub notice: Option<MapError>,
}

impl LoadOutcome {
    fn failed(err: MapError) -> Self {
        log::warn!("map load fell back to empty skeleton: {err}");
        Self {
            document: MapDocument::skeleton(),
            notice: Some(err),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.notice.is_none()
    }
}

/// Parse JSON text and load it. Syntax errors yield [`MapError::Json`].
pub fn parse_document(text: &str) -> LoadOutcome {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => load_document(value),
        Err(e) => LoadOutcome::failed(MapError::Json(e)),
    }
}

pub fn load_document(data: Value) -> LoadOutcome {
    load_document_with(data, DEFAULT_TRANSFER_TIME)
}

/// Load with an explicit fallback time for transfers lacking one.
pub fn load_document_with(data: Value, default_time: f64) -> LoadOutcome {
    let Some(mut canonical) = canonicalize(data) else {
        return LoadOutcome::failed(MapError::UnsupportedFormat(
            "no map section, `lines` array or known alias found".into(),
        ));
    };

    for kind in SectionKind::ALL {
        if let Some(Value::Object(section)) = canonical.get_mut(kind.key()) {
            normalize_transfers(section, default_time);
        }
    }

    match serde_json::from_value::<MapDocument>(Value::Object(canonical)) {
        Ok(document) => {
            log::debug!(
                "loaded map `{}`: {} stations",
                document.info.name.as_deref().unwrap_or(""),
                document.station_count()
            );
            LoadOutcome {
                document,
                notice: None,
            }
        }
        Err(e) => LoadOutcome::failed(MapError::Json(e)),
    }
}

// ─── Shape detection ─────────────────────────────────────────────────────

fn canonicalize(data: Value) -> Option<Map<String, Value>> {
    let Value::Object(root) = data else {
        return None;
    };

    if SectionKind::ALL
        .iter()
        .any(|k| is_truthy(root.get(k.key())))
    {
        log::debug!("map load: canonical shape");
        return Some(root);
    }

    if root.get("lines").is_some_and(Value::is_array) {
        log::debug!("map load: root `lines` array");
        return Some(wrap_as_metro(&root, &root));
    }

    if let Some(alias) = LEGACY_ALIASES
        .iter()
        .find_map(|k| root.get(*k).filter(|v| is_truthy(Some(*v))))
    {
        log::debug!("map load: legacy alias key");
        let carrier = alias.as_object().cloned().unwrap_or_default();
        return Some(wrap_as_metro(&root, &carrier));
    }

    let carrier = find_lines_carrier(&root, 0)?.clone();
    log::debug!("map load: nested `lines` carrier");
    Some(wrap_as_metro(&root, &carrier))
}

/// `{ info, metro_map: { lines, transfers, intermediatePoints, rivers, objects } }`
fn wrap_as_metro(root: &Map<String, Value>, carrier: &Map<String, Value>) -> Map<String, Value> {
    let mut section = Map::new();
    for field in SECTION_FIELDS {
        let value = carrier
            .get(field)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        section.insert(field.into(), value);
    }

    let mut out = Map::new();
    out.insert(
        "info".into(),
        root.get("info")
            .filter(|v| v.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
    );
    out.insert(SectionKind::Metro.key().into(), Value::Object(section));
    out
}

fn find_lines_carrier(obj: &Map<String, Value>, depth: usize) -> Option<&Map<String, Value>> {
    if depth > CARRIER_MAX_DEPTH {
        return None;
    }
    if obj.get("lines").is_some_and(Value::is_array) {
        return Some(obj);
    }
    obj.values().find_map(|child| match child {
        Value::Object(map) => find_lines_carrier(map, depth + 1),
        Value::Array(items) if depth < CARRIER_MAX_DEPTH => items.iter().find_map(|item| {
            item.as_object()
                .and_then(|m| find_lines_carrier(m, depth + 2))
        }),
        _ => None,
    })
}

fn is_truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}

// ─── Transfers ───────────────────────────────────────────────────────────

/// Fill missing transfer fields: id, station array, numeric time, type.
fn normalize_transfers(section: &mut Map<String, Value>, default_time: f64) {
    let Some(Value::Array(transfers)) = section.get_mut("transfers") else {
        return;
    };
    for entry in transfers.iter_mut() {
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(t) = entry else { continue };

        if !is_truthy(t.get("id")) {
            let id = Id::generate("transfer");
            log::debug!("transfer without id, assigned {id}");
            t.insert("id".into(), Value::String(id.as_str().to_owned()));
        }
        if !t.get("stations").is_some_and(Value::is_array) {
            t.insert("stations".into(), Value::Array(Vec::new()));
        }
        if !t.get("time").is_some_and(Value::is_number) {
            t.insert("time".into(), number(default_time));
        }
        if !is_truthy(t.get("type")) {
            t.insert("type".into(), Value::String("default".into()));
        }
    }
}

fn number(v: f64) -> Value {
    if v.fract() == 0.0 && v.is_finite() {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}

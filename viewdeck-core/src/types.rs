//! Panel and session types.
//!
//! `SessionRecord` and `PanelConfig` are the persisted shape held by the backing
//! store. `PanelState` wraps a `PanelConfig` with the client-local navigation
//! fields; it is never serialized into a record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_BACKGROUND: &str = "none";
pub const DEFAULT_THEME: &str = "default";
pub const DEFAULT_SHARED_URL: &str = "https://reactnative.dev";

// ─── Identifiers ──────────────────────────────────────────────

/// Short shareable token naming a persisted session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh 8-character token taken from a v4 UUID.
    pub fn generate() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        Self(raw[..8].to_string())
    }

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Device presets ───────────────────────────────────────────

/// A named viewport size offered when adding a panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DevicePreset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

pub const DEVICE_PRESETS: &[DevicePreset] = &[
    DevicePreset { name: "iPhone SE", width: 375, height: 667 },
    DevicePreset { name: "iPhone 12 Pro", width: 390, height: 844 },
    DevicePreset { name: "Pixel 5", width: 393, height: 851 },
    DevicePreset { name: "iPad Mini", width: 768, height: 1024 },
    DevicePreset { name: "iPad Air", width: 820, height: 1180 },
    DevicePreset { name: "Desktop", width: 1440, height: 900 },
];

impl DevicePreset {
    pub fn find(name: &str) -> Option<&'static DevicePreset> {
        DEVICE_PRESETS.iter().find(|p| p.name == name)
    }
}

// ─── Panels ───────────────────────────────────────────────────

/// Persisted part of a panel. This is exactly what goes into a session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelConfig {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub instrumentation_enabled: bool,
    pub refresh_epoch: u64,
}

impl PanelConfig {
    pub fn new(id: impl Into<String>, width: u32, height: u32, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            title: title.into(),
            instrumentation_enabled: false,
            refresh_epoch: 0,
        }
    }

    /// Panel sized from a preset, titled with the preset name.
    pub fn from_preset(id: impl Into<String>, preset: &DevicePreset) -> Self {
        Self::new(id, preset.width, preset.height, preset.name)
    }

    /// Title used for custom sizes.
    pub fn dimension_title(width: u32, height: u32) -> String {
        format!("{width}x{height}")
    }
}

/// Client-side panel: persisted config plus ephemeral navigation state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelState {
    pub config: PanelConfig,
    /// URL currently shown in the viewport. May diverge from the shared URL
    /// after in-page navigation.
    pub live_url: String,
    /// Shared URL this panel was last reconciled against.
    pub tracked_base_url: String,
}

impl PanelState {
    /// New panel pointing at the shared URL.
    pub fn seeded(config: PanelConfig, shared_url: &str) -> Self {
        Self {
            config,
            live_url: shared_url.to_string(),
            tracked_base_url: shared_url.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Whether in-page navigation has moved this panel off its tracked base.
    pub fn has_diverged(&self) -> bool {
        self.live_url != self.tracked_base_url
    }
}

/// Strip ephemeral fields, keeping order.
pub fn project_panels(panels: &[PanelState]) -> Vec<PanelConfig> {
    panels.iter().map(|p| p.config.clone()).collect()
}

/// Panels shown in a fresh workspace.
pub fn default_panel_configs() -> Vec<PanelConfig> {
    vec![
        PanelConfig::new("iphone-se-preview", 375, 667, "iPhone SE"),
        PanelConfig::new("ipad-mini-preview", 768, 1024, "iPad Mini"),
        PanelConfig::new("desktop-preview", 1440, 900, "Desktop"),
    ]
}

// ─── Session record ───────────────────────────────────────────

/// Persisted session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub shared_url: String,
    pub panels: Vec<PanelConfig>,
    pub background: String,
    pub theme: String,
}

impl SessionRecord {
    /// Read boundary for stored JSON. Fields are default-filled one by one
    /// here and nowhere else: a missing or mistyped field falls back on its
    /// own without disturbing the rest. Returns `None` when there is no
    /// record at all.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };
        Some(SessionRecord {
            shared_url: text_field(&map, &["sharedUrl", "url"]).unwrap_or_default(),
            panels: field(&map, &["panels", "previews"])
                .map(raw_panels)
                .unwrap_or_default(),
            background: text_field(&map, &["background"])
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string()),
            theme: text_field(&map, &["theme"])
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_THEME.to_string()),
        })
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ─── Lenient field reads ──────────────────────────────────────
//
// Stored records are loosely shaped: older clients wrote `url` / `previews` /
// `isDevToolsOpen` / `refreshKey`, and JS-backed stores hand back floats or
// strings where integers were written.

const FALLBACK_WIDTH: u32 = 1440;
const FALLBACK_HEIGHT: u32 = 900;

/// Largest width or height a panel may have.
pub const MAX_PANEL_DIMENSION: u32 = 10_000;

/// First present, non-null value among `keys`.
fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let value = field(map, keys)?;
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        other => {
            tracing::warn!("Ignoring non-text value for {:?}: {}", keys[0], other);
            None
        }
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Positive dimension, rounded and clamped to `MAX_PANEL_DIMENSION`.
fn dimension(map: &Map<String, Value>, key: &str) -> Option<u32> {
    let raw = number(field(map, &[key])?)?;
    if !raw.is_finite() {
        return None;
    }
    let rounded = raw.round();
    if rounded < 1.0 {
        return None;
    }
    Some(rounded.min(MAX_PANEL_DIMENSION as f64) as u32)
}

fn counter(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    let value = field(map, keys)?;
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    number(value)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64)
}

fn flag(map: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    match field(map, keys)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

/// Panels may arrive as an array or, from key-indexed stores, as an object
/// keyed by position. Entries without an id are dropped, as are repeated ids.
fn raw_panels(value: &Value) -> Vec<PanelConfig> {
    let entries: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => {
            let mut keyed: Vec<(u64, &Value)> = map
                .iter()
                .filter_map(|(k, v)| k.parse::<u64>().ok().map(|idx| (idx, v)))
                .collect();
            keyed.sort_by_key(|(idx, _)| *idx);
            keyed.into_iter().map(|(_, v)| v).collect()
        }
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut panels = Vec::with_capacity(entries.len());
    for entry in entries {
        let Value::Object(map) = entry else {
            tracing::warn!("Dropping non-object panel entry: {}", entry);
            continue;
        };
        let Some(id) = text_field(map, &["id"]).filter(|id| !id.is_empty()) else {
            tracing::warn!("Dropping panel entry without an id");
            continue;
        };
        if !seen.insert(id.clone()) {
            tracing::warn!("Dropping duplicate panel id {}", id);
            continue;
        }
        let width = dimension(map, "width").unwrap_or(FALLBACK_WIDTH);
        let height = dimension(map, "height").unwrap_or(FALLBACK_HEIGHT);
        panels.push(PanelConfig {
            id,
            width,
            height,
            title: text_field(map, &["title"])
                .unwrap_or_else(|| PanelConfig::dimension_title(width, height)),
            instrumentation_enabled: flag(map, &["instrumentationEnabled", "isDevToolsOpen"])
                .unwrap_or(false),
            refresh_epoch: counter(map, &["refreshEpoch", "refreshKey"]).unwrap_or(0),
        });
    }
    panels
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_session_id_is_eight_chars() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), 8);
        assert_ne!(id, SessionId::generate());
    }

    #[test]
    fn test_record_never_carries_ephemeral_fields() {
        let panels = vec![PanelState {
            config: PanelConfig::new("a", 375, 667, "iPhone SE"),
            live_url: "https://example.com/deep".into(),
            tracked_base_url: "https://example.com".into(),
        }];
        let record = SessionRecord {
            shared_url: "https://example.com".into(),
            panels: project_panels(&panels),
            background: DEFAULT_BACKGROUND.into(),
            theme: DEFAULT_THEME.into(),
        };
        let text = serde_json::to_string(&record).unwrap();
        assert!(!text.contains("liveUrl"));
        assert!(!text.contains("trackedBaseUrl"));
        assert!(text.contains("\"instrumentationEnabled\":false"));
        assert!(text.contains("\"refreshEpoch\":0"));
    }

    #[test]
    fn test_null_is_no_record() {
        assert!(SessionRecord::from_value(Value::Null).is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let record = SessionRecord::from_value(json!({
            "panels": [{ "id": "p1" }, { "width": 10 }]
        }))
        .unwrap();

        assert_eq!(record.shared_url, "");
        assert_eq!(record.background, "none");
        assert_eq!(record.theme, "default");
        assert_eq!(record.panels.len(), 1);
        assert_eq!(record.panels[0].width, 1440);
        assert_eq!(record.panels[0].height, 900);
        assert_eq!(record.panels[0].title, "1440x900");
        assert!(!record.panels[0].instrumentation_enabled);
    }

    #[test]
    fn test_legacy_field_names_are_read() {
        let record = SessionRecord::from_value(json!({
            "url": "https://example.com",
            "previews": [{ "id": "p1", "width": 375, "height": 667, "title": "iPhone SE",
                           "isDevToolsOpen": true, "refreshKey": 3 }],
            "background": "aurora",
            "theme": "theme-latte"
        }))
        .unwrap();

        assert_eq!(record.shared_url, "https://example.com");
        assert_eq!(record.panels[0].refresh_epoch, 3);
        assert!(record.panels[0].instrumentation_enabled);
        assert_eq!(record.theme, "theme-latte");
    }

    #[test]
    fn test_object_keyed_panels_keep_index_order() {
        let record = SessionRecord::from_value(json!({
            "sharedUrl": "https://example.com",
            "panels": { "1": { "id": "b" }, "0": { "id": "a" }, "10": { "id": "c" } }
        }))
        .unwrap();
        let ids: Vec<_> = record.panels.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let record = SessionRecord::from_value(json!({
            "panels": [{ "id": "a", "title": "first" }, { "id": "a", "title": "second" }]
        }))
        .unwrap();
        assert_eq!(record.panels.len(), 1);
        assert_eq!(record.panels[0].title, "first");
    }

    #[test]
    fn test_preset_lookup() {
        let preset = DevicePreset::find("iPad Mini").unwrap();
        assert_eq!((preset.width, preset.height), (768, 1024));
        assert!(DevicePreset::find("Custom").is_none());
    }

    #[test]
    fn test_mistyped_field_falls_back_alone() {
        let record = SessionRecord::from_value(json!({
            "sharedUrl": "https://example.com",
            "panels": [{ "id": "a", "width": 375, "height": 667, "title": "iPhone SE",
                         "instrumentationEnabled": false, "refreshEpoch": 0 }],
            "background": "none",
            "theme": 5
        }))
        .unwrap();

        assert_eq!(record.shared_url, "https://example.com");
        assert_eq!(record.panels.len(), 1);
        assert_eq!(record.panels[0].title, "iPhone SE");
        assert_eq!(record.theme, "5");

        let record = SessionRecord::from_value(json!({
            "sharedUrl": "https://example.com",
            "panels": [{ "id": "a" }],
            "theme": { "nested": true }
        }))
        .unwrap();
        assert_eq!(record.theme, "default");
        assert_eq!(record.panels.len(), 1);
    }

    #[test]
    fn test_panel_fields_are_coerced_individually() {
        let record = SessionRecord::from_value(json!({
            "panels": [
                { "id": "a", "width": 375.5, "height": 667 },
                { "id": "b", "width": "390", "height": null, "title": 7,
                  "instrumentationEnabled": "yes", "refreshEpoch": 2.0 },
                { "id": "c", "width": -5, "height": [1] }
            ]
        }))
        .unwrap();

        let sizes: Vec<_> = record.panels.iter().map(|p| (p.width, p.height)).collect();
        assert_eq!(sizes, vec![(376, 667), (390, 900), (1440, 900)]);
        assert_eq!(record.panels[1].title, "7");
        assert!(!record.panels[1].instrumentation_enabled);
        assert_eq!(record.panels[1].refresh_epoch, 2);
    }

    #[test]
    fn test_oversized_dimensions_are_clamped() {
        let record = SessionRecord::from_value(json!({
            "panels": [{ "id": "a", "width": 4294967295u64, "height": 1e300 }]
        }))
        .unwrap();
        assert_eq!(record.panels[0].width, MAX_PANEL_DIMENSION);
        assert_eq!(record.panels[0].height, MAX_PANEL_DIMENSION);
    }
}

//! Navigation reporting protocol.
//!
//! An embedded page cannot be observed by the host. The proxy injects a small
//! script that posts a `NavigationReport` to the parent window whenever the
//! page's location changes; the host turns each valid report into a
//! `NavigationEvent` for the addressed panel. The channel is one-way and
//! carries nothing else.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminant carried in every report.
pub const NAVIGATION_REPORT_TYPE: &str = "viewdeck-url-update";

/// Delay before the first report, giving client-rendered apps time to settle
/// their initial route.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;

/// In-page inspector loaded alongside the reporter.
pub const INSPECTOR_SCRIPT_SRC: &str = "https://cdn.jsdelivr.net/npm/eruda";

/// Marker attribute on the injected reporter script.
pub const INSTRUMENTATION_MARKER: &str = "data-viewdeck-instrumentation";

/// Wire shape of a report: `{type, url, panelId}`. Nothing more.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NavigationReport {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub panel_id: String,
}

/// A validated report addressed to one panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationEvent {
    pub panel_id: String,
    pub reported_url: String,
}

impl NavigationReport {
    pub fn new(url: impl Into<String>, panel_id: impl Into<String>) -> Self {
        Self {
            kind: NAVIGATION_REPORT_TYPE.to_string(),
            url: url.into(),
            panel_id: panel_id.into(),
        }
    }

    /// Parse a raw message. Anything that is not exactly a report is `None`.
    pub fn parse(raw: &str) -> Option<NavigationEvent> {
        let report: NavigationReport = serde_json::from_str(raw).ok()?;
        report.into_event()
    }

    pub fn from_value(value: Value) -> Option<NavigationEvent> {
        let report: NavigationReport = serde_json::from_value(value).ok()?;
        report.into_event()
    }

    fn into_event(self) -> Option<NavigationEvent> {
        if self.kind != NAVIGATION_REPORT_TYPE || self.url.is_empty() || self.panel_id.is_empty()
        {
            return None;
        }
        Some(NavigationEvent {
            panel_id: self.panel_id,
            reported_url: self.url,
        })
    }
}

// ─── Injected client half ─────────────────────────────────────

const REPORTER_TEMPLATE: &str = r#"<script __MARKER__>
(function() {
  var panelId = __PANEL_ID__;
  function reportUrl() {
    if (window.parent && window.parent !== window) {
      window.parent.postMessage({ type: '__TYPE__', url: window.location.href, panelId: panelId }, '*');
    }
  }
  setTimeout(reportUrl, __DELAY__);
  var originalPushState = history.pushState;
  history.pushState = function() {
    var result = originalPushState.apply(this, arguments);
    reportUrl();
    return result;
  };
  window.addEventListener('popstate', reportUrl);
})();
</script>"#;

/// Builds the script block injected into proxied HTML.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instrumentation {
    pub settle_delay_ms: u64,
    /// Load the in-page inspector after the reporter.
    pub inspector: bool,
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            inspector: true,
        }
    }
}

impl Instrumentation {
    pub fn script_block(&self, panel_id: &str) -> String {
        let mut block = REPORTER_TEMPLATE
            .replace("__MARKER__", INSTRUMENTATION_MARKER)
            .replace("__PANEL_ID__", &js_string_literal(panel_id))
            .replace("__TYPE__", NAVIGATION_REPORT_TYPE)
            .replace("__DELAY__", &self.settle_delay_ms.to_string());
        if self.inspector {
            block.push_str(&format!(
                "\n<script src=\"{INSPECTOR_SCRIPT_SRC}\"></script>\n<script>eruda.init();</script>"
            ));
        }
        block
    }
}

/// JSON string literal that is also safe inside an inline `<script>`.
fn js_string_literal(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_report() {
        let raw = r#"{"type":"viewdeck-url-update","url":"https://example.com/about","panelId":"a"}"#;
        let event = NavigationReport::parse(raw).unwrap();
        assert_eq!(event.panel_id, "a");
        assert_eq!(event.reported_url, "https://example.com/about");
    }

    #[test]
    fn test_wrong_discriminant_is_ignored() {
        let value = json!({ "type": "something-else", "url": "https://x.dev", "panelId": "a" });
        assert!(NavigationReport::from_value(value).is_none());
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let value = json!({
            "type": NAVIGATION_REPORT_TYPE, "url": "https://x.dev", "panelId": "a", "cookie": "x"
        });
        assert!(NavigationReport::from_value(value).is_none());
    }

    #[test]
    fn test_missing_or_empty_fields_are_ignored() {
        assert!(NavigationReport::from_value(json!({ "type": NAVIGATION_REPORT_TYPE, "url": "https://x.dev" })).is_none());
        assert!(NavigationReport::from_value(json!({ "type": NAVIGATION_REPORT_TYPE, "url": "", "panelId": "a" })).is_none());
        assert!(NavigationReport::parse("not json").is_none());
        assert!(NavigationReport::from_value(json!("viewdeck-url-update")).is_none());
    }

    #[test]
    fn test_report_round_trips_through_wire_shape() {
        let text = serde_json::to_string(&NavigationReport::new("https://x.dev", "p")).unwrap();
        assert_eq!(
            text,
            r#"{"type":"viewdeck-url-update","url":"https://x.dev","panelId":"p"}"#
        );
    }

    #[test]
    fn test_script_block_embeds_panel_and_delay() {
        let script = Instrumentation {
            settle_delay_ms: 250,
            inspector: false,
        }
        .script_block("panel-1");
        assert!(script.contains("var panelId = \"panel-1\";"));
        assert!(script.contains("setTimeout(reportUrl, 250);"));
        assert!(script.contains("history.pushState = function()"));
        assert!(script.contains("addEventListener('popstate', reportUrl)"));
        assert!(script.contains(NAVIGATION_REPORT_TYPE));
        assert!(!script.contains(INSPECTOR_SCRIPT_SRC));
    }

    #[test]
    fn test_script_block_escapes_hostile_panel_id() {
        let script = Instrumentation::default().script_block("</script><script>alert(1)");
        assert!(!script.contains("</script><script>alert(1)"));
        assert!(script.contains(INSPECTOR_SCRIPT_SRC));
    }
}

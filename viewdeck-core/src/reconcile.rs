//! Merge of a persisted session record into local panel state.
//!
//! `reconcile` is pure and total: it depends only on the previous local
//! panels, the incoming persisted panels and the incoming shared URL, so it
//! can be applied whenever a record arrives, including while a local edit is
//! still in flight.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{PanelConfig, PanelState};

/// What wins when the shared URL changes under a panel that was navigated
/// independently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharedUrlPrecedence {
    /// A shared URL change resets every panel, discarding in-page navigation.
    #[default]
    PreferShared,
    /// A panel whose live URL has diverged keeps it; only its tracked base
    /// moves.
    PreserveNavigation,
}

/// Rebuild local panel state from an incoming persisted panel list.
///
/// Output follows `incoming` order exactly. Panels absent from `incoming` are
/// dropped; new ones are seeded at the shared URL.
pub fn reconcile(
    previous: &[PanelState],
    incoming: &[PanelConfig],
    shared_url: &str,
    precedence: SharedUrlPrecedence,
) -> Vec<PanelState> {
    let by_id: HashMap<&str, &PanelState> = previous.iter().map(|p| (p.id(), p)).collect();

    incoming
        .iter()
        .map(|config| match by_id.get(config.id.as_str()) {
            None => PanelState::seeded(config.clone(), shared_url),
            Some(existing) if existing.tracked_base_url != shared_url => {
                let keep_live = precedence == SharedUrlPrecedence::PreserveNavigation
                    && existing.has_diverged();
                PanelState {
                    config: config.clone(),
                    live_url: if keep_live {
                        existing.live_url.clone()
                    } else {
                        shared_url.to_string()
                    },
                    tracked_base_url: shared_url.to_string(),
                }
            }
            Some(existing) => PanelState {
                config: config.clone(),
                live_url: existing.live_url.clone(),
                tracked_base_url: existing.tracked_base_url.clone(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(id: &str) -> PanelConfig {
        PanelConfig::new(id, 375, 667, id)
    }

    fn navigated(id: &str, base: &str, live: &str) -> PanelState {
        PanelState {
            config: config(id),
            live_url: live.into(),
            tracked_base_url: base.into(),
        }
    }

    #[test]
    fn test_new_panels_are_seeded() {
        let out = reconcile(&[], &[config("a"), config("b")], "https://e.com", Default::default());
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| p.live_url == "https://e.com"));
        assert!(out.iter().all(|p| p.tracked_base_url == "https://e.com"));
    }

    #[test]
    fn test_unchanged_shared_url_keeps_independent_navigation() {
        let previous = vec![
            navigated("a", "https://e.com", "https://e.com/about"),
            navigated("b", "https://e.com", "https://e.com"),
        ];
        let incoming = vec![config("a"), config("b")];

        let once = reconcile(&previous, &incoming, "https://e.com", Default::default());
        let twice = reconcile(&once, &incoming, "https://e.com", Default::default());

        assert_eq!(twice[0].live_url, "https://e.com/about");
        assert_eq!(twice[1].live_url, "https://e.com");
    }

    #[test]
    fn test_changed_shared_url_resets_every_panel() {
        let previous = vec![
            navigated("a", "https://e.com", "https://e.com/about"),
            navigated("b", "https://e.com", "https://e.com"),
        ];
        let out = reconcile(
            &previous,
            &[config("a"), config("b")],
            "https://other.dev",
            SharedUrlPrecedence::PreferShared,
        );
        for panel in &out {
            assert_eq!(panel.live_url, "https://other.dev");
            assert_eq!(panel.tracked_base_url, "https://other.dev");
        }
    }

    #[test]
    fn test_preserve_navigation_policy_keeps_diverged_panels() {
        let previous = vec![
            navigated("a", "https://e.com", "https://e.com/about"),
            navigated("b", "https://e.com", "https://e.com"),
        ];
        let out = reconcile(
            &previous,
            &[config("a"), config("b")],
            "https://other.dev",
            SharedUrlPrecedence::PreserveNavigation,
        );
        assert_eq!(out[0].live_url, "https://e.com/about");
        assert_eq!(out[0].tracked_base_url, "https://other.dev");
        assert_eq!(out[1].live_url, "https://other.dev");
    }

    #[test]
    fn test_removed_panels_drop_and_order_follows_incoming() {
        let previous = vec![
            navigated("a", "u", "u/a"),
            navigated("b", "u", "u/b"),
            navigated("c", "u", "u/c"),
        ];
        let out = reconcile(&previous, &[config("c"), config("d"), config("a")], "u", Default::default());
        let ids: Vec<_> = out.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["c", "d", "a"]);
        assert_eq!(out[0].live_url, "u/c");
        assert_eq!(out[1].live_url, "u");
        assert_eq!(out[2].live_url, "u/a");
    }

    #[test]
    fn test_persisted_fields_come_from_incoming() {
        let previous = vec![navigated("a", "u", "u/x")];
        let mut updated = config("a");
        updated.refresh_epoch = 4;
        updated.instrumentation_enabled = true;
        let out = reconcile(&previous, &[updated.clone()], "u", Default::default());
        assert_eq!(out[0].config, updated);
        assert_eq!(out[0].live_url, "u/x");
    }
}

//! Client workspace: shared URL, panels, presentation and session mode.
//!
//! Every local mutation is applied to local state first and then, when the
//! workspace is joined to a session, written to the store at the matching
//! field. Remote records flow back through `apply_remote`, which is the only
//! place the pure `reconcile` merge runs.
//!
//! ```text
//!  Local-only ──create_session──▶ Joined(id)
//!      │                             ▲
//!      └────────join_session(id)─────┘   (SessionNotFound leaves Local-only)
//! ```

use std::sync::Arc;

use tokio::sync::watch;

use crate::arrangement::ArrangementEngine;
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::navigation::{NavigationEvent, NavigationReport};
use crate::presentation::{AppliedConfiguration, Background, Theme};
use crate::reconcile::{reconcile, SharedUrlPrecedence};
use crate::rewrite::normalize_target_url;
use crate::store::{FieldWrite, SessionStore};
use crate::types::{
    default_panel_configs, project_panels, DevicePreset, PanelConfig, PanelState, SessionId,
    SessionRecord, DEFAULT_BACKGROUND, DEFAULT_SHARED_URL, DEFAULT_THEME, MAX_PANEL_DIMENSION,
};

/// Target used by the "preview local app" shortcut.
pub const LOCAL_PREVIEW_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionMode {
    LocalOnly,
    Joined(SessionId),
}

pub struct Workspace {
    shared_url: String,
    panels: Vec<PanelState>,
    background: String,
    theme: String,
    /// Single global "last independently navigated URL" used by sync.
    last_navigated_url: Option<String>,
    precedence: SharedUrlPrecedence,
    arrangement: ArrangementEngine,
    applied: AppliedConfiguration,
    store: Option<Arc<dyn SessionStore>>,
    mode: SessionMode,
    subscription: Option<watch::Receiver<SessionRecord>>,
}

impl Workspace {
    /// Fresh local workspace with the default panel set.
    pub fn new(store: Option<Arc<dyn SessionStore>>) -> Self {
        let panels: Vec<PanelState> = default_panel_configs()
            .into_iter()
            .map(|config| PanelState::seeded(config, DEFAULT_SHARED_URL))
            .collect();
        let arrangement = ArrangementEngine::new(panels.iter().map(|p| p.id().to_string()));
        let mut applied = AppliedConfiguration::default();
        applied.apply_raw(DEFAULT_BACKGROUND, DEFAULT_THEME);

        Self {
            shared_url: DEFAULT_SHARED_URL.to_string(),
            panels,
            background: DEFAULT_BACKGROUND.to_string(),
            theme: DEFAULT_THEME.to_string(),
            last_navigated_url: None,
            precedence: SharedUrlPrecedence::default(),
            arrangement,
            applied,
            store,
            mode: SessionMode::LocalOnly,
            subscription: None,
        }
    }

    pub fn with_precedence(mut self, precedence: SharedUrlPrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    // ─── Accessors ────────────────────────────────────────────

    pub fn shared_url(&self) -> &str {
        &self.shared_url
    }

    pub fn panels(&self) -> &[PanelState] {
        &self.panels
    }

    pub fn panel(&self, id: &str) -> Option<&PanelState> {
        self.panels.iter().find(|p| p.id() == id)
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn last_navigated_url(&self) -> Option<&str> {
        self.last_navigated_url.as_deref()
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match &self.mode {
            SessionMode::Joined(id) => Some(id),
            SessionMode::LocalOnly => None,
        }
    }

    pub fn is_sharing_available(&self) -> bool {
        self.store.is_some()
    }

    pub fn arrangement(&self) -> &ArrangementEngine {
        &self.arrangement
    }

    /// Layout mode, maximize, and in-progress gestures are local-only and
    /// never persisted.
    pub fn arrangement_mut(&mut self) -> &mut ArrangementEngine {
        &mut self.arrangement
    }

    pub fn applied(&self) -> &AppliedConfiguration {
        &self.applied
    }

    /// Persisted projection of the current state.
    pub fn snapshot(&self) -> SessionRecord {
        SessionRecord {
            shared_url: self.shared_url.clone(),
            panels: project_panels(&self.panels),
            background: self.background.clone(),
            theme: self.theme.clone(),
        }
    }

    fn panel_mut(&mut self, id: &str) -> WorkspaceResult<&mut PanelState> {
        self.panels
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or_else(|| WorkspaceError::UnknownPanel(id.to_string()))
    }

    async fn persist(&self, write: FieldWrite) -> WorkspaceResult<()> {
        let (SessionMode::Joined(id), Some(store)) = (&self.mode, &self.store) else {
            return Ok(());
        };
        tracing::debug!("Writing {} to session {}", write.field(), id);
        store.write_field(id, &write).await?;
        Ok(())
    }

    async fn persist_panels(&self) -> WorkspaceResult<()> {
        self.persist(FieldWrite::Panels(project_panels(&self.panels)))
            .await
    }

    // ─── Local mutations ──────────────────────────────────────

    /// Point every panel at a new shared URL. Discards independent navigation.
    pub async fn set_shared_url(&mut self, raw: &str) -> WorkspaceResult<()> {
        if raw.trim().is_empty() {
            return Err(WorkspaceError::InvalidInput("URL must not be empty".into()));
        }
        let url = normalize_target_url(raw);
        tracing::info!("Shared URL -> {}", url);
        self.shared_url = url.clone();
        for panel in &mut self.panels {
            panel.live_url = url.clone();
            panel.tracked_base_url = url.clone();
        }
        self.last_navigated_url = None;
        self.persist(FieldWrite::SharedUrl(url)).await
    }

    pub async fn preview_local(&mut self) -> WorkspaceResult<()> {
        self.set_shared_url(LOCAL_PREVIEW_URL).await
    }

    /// Add a panel of the given size. The title defaults to `{w}x{h}`.
    pub async fn add_panel(
        &mut self,
        width: u32,
        height: u32,
        title: Option<String>,
    ) -> WorkspaceResult<String> {
        if width == 0 || height == 0 {
            return Err(WorkspaceError::InvalidInput(
                "Width and height must be positive".into(),
            ));
        }
        if width > MAX_PANEL_DIMENSION || height > MAX_PANEL_DIMENSION {
            return Err(WorkspaceError::InvalidInput(format!(
                "Width and height must not exceed {MAX_PANEL_DIMENSION}"
            )));
        }
        if !self.arrangement.can_add() {
            let capacity = self
                .arrangement
                .layout()
                .capacity()
                .unwrap_or(self.panels.len());
            return Err(WorkspaceError::LayoutFull(capacity));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let title = title.unwrap_or_else(|| PanelConfig::dimension_title(width, height));
        let config = PanelConfig::new(id.clone(), width, height, title);

        self.panels
            .push(PanelState::seeded(config, &self.shared_url));
        self.arrangement.add(id.clone());
        tracing::debug!("Added panel {} ({}x{})", id, width, height);
        self.persist_panels().await?;
        Ok(id)
    }

    pub async fn add_preset_panel(&mut self, preset_name: &str) -> WorkspaceResult<String> {
        let preset = DevicePreset::find(preset_name).ok_or_else(|| {
            WorkspaceError::InvalidInput(format!("Unknown device preset {preset_name}"))
        })?;
        self.add_panel(preset.width, preset.height, Some(preset.name.to_string()))
            .await
    }

    pub async fn remove_panel(&mut self, id: &str) -> WorkspaceResult<()> {
        let before = self.panels.len();
        self.panels.retain(|p| p.id() != id);
        if self.panels.len() == before {
            return Err(WorkspaceError::UnknownPanel(id.to_string()));
        }
        self.arrangement.remove(id);
        self.persist_panels().await
    }

    /// Flip a panel's instrumentation flag. Returns the new value.
    pub async fn toggle_instrumentation(&mut self, id: &str) -> WorkspaceResult<bool> {
        let panel = self.panel_mut(id)?;
        panel.config.instrumentation_enabled = !panel.config.instrumentation_enabled;
        let enabled = panel.config.instrumentation_enabled;
        self.persist_panels().await?;
        Ok(enabled)
    }

    /// Reset a panel to the shared URL and force its embedded context to
    /// re-mount.
    pub async fn refresh_panel(&mut self, id: &str) -> WorkspaceResult<()> {
        let shared = self.shared_url.clone();
        let panel = self.panel_mut(id)?;
        panel.live_url = shared.clone();
        panel.tracked_base_url = shared;
        panel.config.refresh_epoch += 1;
        self.persist_panels().await
    }

    fn adopt_arrangement_order(&mut self) {
        let order = self.arrangement.order().to_vec();
        self.panels.sort_by_key(|p| {
            order
                .iter()
                .position(|id| id == p.id())
                .unwrap_or(usize::MAX)
        });
    }

    /// Move `source` to `target`'s slot. Returns whether anything moved.
    pub async fn reorder(&mut self, source: &str, target: &str) -> WorkspaceResult<bool> {
        if !self.arrangement.move_panel(source, target) {
            return Ok(false);
        }
        self.adopt_arrangement_order();
        self.persist_panels().await?;
        Ok(true)
    }

    /// Keyboard reorder by `offset` slots.
    pub async fn move_panel_by(&mut self, id: &str, offset: isize) -> WorkspaceResult<bool> {
        if !self.arrangement.move_by(id, offset) {
            return Ok(false);
        }
        self.adopt_arrangement_order();
        self.persist_panels().await?;
        Ok(true)
    }

    /// Finish a pointer drag over `over`. Returns whether the order changed.
    pub async fn finish_drag(&mut self, over: Option<&str>) -> WorkspaceResult<bool> {
        if !self.arrangement.pointer_up(over) {
            return Ok(false);
        }
        self.adopt_arrangement_order();
        self.persist_panels().await?;
        Ok(true)
    }

    pub async fn set_background(&mut self, background: Background) -> WorkspaceResult<()> {
        self.background = background.as_str().to_string();
        self.applied.apply_raw(&self.background, &self.theme);
        self.persist(FieldWrite::Background(self.background.clone()))
            .await
    }

    pub async fn set_theme(&mut self, theme: Theme) -> WorkspaceResult<()> {
        self.theme = theme.as_str().to_string();
        self.applied.apply_raw(&self.background, &self.theme);
        self.persist(FieldWrite::Theme(self.theme.clone())).await
    }

    // ─── Navigation ───────────────────────────────────────────

    /// Feed a raw cross-context message. Anything that is not a navigation
    /// report is ignored.
    pub fn handle_navigation_message(&mut self, raw: &str) -> bool {
        match NavigationReport::parse(raw) {
            Some(event) => self.apply_navigation(event),
            None => {
                tracing::debug!("Ignoring non-navigation message");
                false
            }
        }
    }

    /// Update the addressed panel's live URL only. Unknown panels are ignored.
    pub fn apply_navigation(&mut self, event: NavigationEvent) -> bool {
        let Some(panel) = self.panels.iter_mut().find(|p| p.id() == event.panel_id) else {
            tracing::debug!("Navigation report for unknown panel {}", event.panel_id);
            return false;
        };
        panel.live_url = event.reported_url.clone();
        self.last_navigated_url = Some(event.reported_url);
        true
    }

    /// Promote the last independently navigated URL to the shared URL.
    pub async fn sync_panels(&mut self) -> WorkspaceResult<()> {
        let url = self
            .last_navigated_url
            .clone()
            .ok_or(WorkspaceError::NothingToSync)?;
        self.set_shared_url(&url).await
    }

    // ─── Sessions ─────────────────────────────────────────────

    fn require_store(&self) -> WorkspaceResult<Arc<dyn SessionStore>> {
        self.store
            .clone()
            .ok_or(WorkspaceError::ConfigurationMissing)
    }

    /// Snapshot local state under a fresh id and join it.
    pub async fn create_session(&mut self) -> WorkspaceResult<SessionId> {
        let store = self.require_store()?;
        let id = SessionId::generate();
        store.create(&id, &self.snapshot()).await?;
        let rx = store.subscribe(&id).await?;
        tracing::info!("Created session {}", id);
        self.subscription = Some(rx);
        self.mode = SessionMode::Joined(id.clone());
        Ok(id)
    }

    /// Join an existing session. One lookup; a missing record is
    /// `SessionNotFound`.
    pub async fn join_session(&mut self, id: &SessionId) -> WorkspaceResult<()> {
        let store = self.require_store()?;
        let Some(record) = store.load(id).await? else {
            tracing::info!("Session {} not found", id);
            return Err(WorkspaceError::SessionNotFound(id.to_string()));
        };
        let rx = store.subscribe(id).await?;
        self.panels.clear();
        self.last_navigated_url = None;
        self.apply_remote(record);
        self.subscription = Some(rx);
        self.mode = SessionMode::Joined(id.clone());
        tracing::info!("Joined session {}", id);
        Ok(())
    }

    pub fn leave_session(&mut self) {
        self.subscription = None;
        self.mode = SessionMode::LocalOnly;
    }

    /// Merge a persisted record into local state. Never fails.
    pub fn apply_remote(&mut self, record: SessionRecord) {
        self.panels = reconcile(
            &self.panels,
            &record.panels,
            &record.shared_url,
            self.precedence,
        );
        self.shared_url = record.shared_url;
        self.background = record.background;
        self.theme = record.theme;
        self.applied.apply_raw(&self.background, &self.theme);
        self.arrangement
            .sync_order(self.panels.iter().map(|p| p.id().to_string()));
    }

    /// Wait for the next remote record and merge it. `false` once the
    /// subscription has ended or there is none.
    pub async fn next_remote(&mut self) -> bool {
        let Some(rx) = self.subscription.as_mut() else {
            return false;
        };
        if rx.changed().await.is_err() {
            tracing::warn!("Session subscription closed");
            self.subscription = None;
            return false;
        }
        let record = rx.borrow_and_update().clone();
        self.apply_remote(record);
        true
    }

    /// Merge the latest record if one arrived since the last merge.
    pub fn poll_remote(&mut self) -> bool {
        let Some(rx) = self.subscription.as_mut() else {
            return false;
        };
        if !rx.has_changed().unwrap_or(false) {
            return false;
        }
        let record = rx.borrow_and_update().clone();
        self.apply_remote(record);
        true
    }
}

//! Workspace backdrop and colour theme.
//!
//! The persisted record stores plain strings; these enums are the closed set
//! the host knows how to render. `AppliedConfiguration` is what is currently
//! on screen, and `apply` is idempotent so it can run on every record.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    #[default]
    None,
    Aurora,
    Pastel,
    Summit,
    Geometry,
}

impl Background {
    pub const ALL: [Background; 5] = [
        Background::None,
        Background::Aurora,
        Background::Pastel,
        Background::Summit,
        Background::Geometry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Background::None => "none",
            Background::Aurora => "aurora",
            Background::Pastel => "pastel",
            Background::Summit => "summit",
            Background::Geometry => "geometry",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Background::None => "None",
            Background::Aurora => "Aurora",
            Background::Pastel => "Pastel",
            Background::Summit => "Summit",
            Background::Geometry => "Geometry",
        }
    }

    pub fn wallpaper_url(&self) -> Option<&'static str> {
        match self {
            Background::None => None,
            Background::Aurora => Some(
                "https://images.unsplash.com/photo-1579546929518-9e396f3cc809?auto=format&fit=crop",
            ),
            Background::Pastel => Some(
                "https://images.unsplash.com/photo-1557682224-5b8590cd9ec5?auto=format&fit=crop",
            ),
            Background::Summit => Some(
                "https://images.unsplash.com/photo-1506744038136-46273834b3fb?auto=format&fit=crop",
            ),
            Background::Geometry => Some(
                "https://images.unsplash.com/photo-1528459801416-a9e53bbf4e17?auto=format&fit=crop",
            ),
        }
    }

    /// Unknown values fall back to `None`.
    pub fn parse(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == raw)
            .unwrap_or_else(|| {
                tracing::warn!("Unknown background {:?}, using none", raw);
                Background::None
            })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "theme-midnight")]
    Midnight,
    #[serde(rename = "theme-latte")]
    Latte,
    #[serde(rename = "theme-solar-flare")]
    SolarFlare,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Default, Theme::Midnight, Theme::Latte, Theme::SolarFlare];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Midnight => "theme-midnight",
            Theme::Latte => "theme-latte",
            Theme::SolarFlare => "theme-solar-flare",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::Default => "Default",
            Theme::Midnight => "Midnight",
            Theme::Latte => "Latte",
            Theme::SolarFlare => "Solar Flare",
        }
    }

    /// Root class to add; the default theme has none.
    pub fn class(&self) -> Option<&'static str> {
        match self {
            Theme::Default => None,
            other => Some(other.as_str()),
        }
    }

    pub fn is_dark(&self) -> bool {
        !matches!(self, Theme::Latte)
    }

    pub fn parse(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == raw)
            .unwrap_or_else(|| {
                tracing::warn!("Unknown theme {:?}, using default", raw);
                Theme::Default
            })
    }
}

/// Presentation currently in effect on the host surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliedConfiguration {
    pub background: Background,
    pub theme: Theme,
    pub theme_class: Option<&'static str>,
    pub dark_mode: bool,
    pub wallpaper: Option<&'static str>,
}

impl AppliedConfiguration {
    pub fn wallpaper_active(&self) -> bool {
        self.wallpaper.is_some()
    }

    /// Bring the surface in line with `background` and `theme`. Returns
    /// whether anything changed.
    pub fn apply(&mut self, background: Background, theme: Theme) -> bool {
        let next = AppliedConfiguration {
            background,
            theme,
            theme_class: theme.class(),
            dark_mode: theme.is_dark(),
            wallpaper: background.wallpaper_url(),
        };
        if *self == next {
            return false;
        }
        *self = next;
        true
    }

    /// Apply the raw strings held in a session record.
    pub fn apply_raw(&mut self, background: &str, theme: &str) -> bool {
        self.apply(Background::parse(background), Theme::parse(theme))
    }
}

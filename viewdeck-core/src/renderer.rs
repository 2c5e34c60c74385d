//! How one panel is drawn at its simulated device size.
//!
//! The device frame is the viewport plus a bezel on every side; the frame is
//! scaled uniformly to fit its container. A scale of zero means the container
//! has not been measured yet and the frame stays hidden.

use serde::Serialize;

use crate::rewrite::is_local_target;
use crate::types::PanelState;

/// Route the host serves the content proxy on.
pub const PROXY_ROUTE: &str = "/proxy";

/// Capabilities granted to embedded content.
pub const EMBED_SANDBOX: &str = "allow-scripts allow-same-origin allow-forms allow-popups";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    pub fn for_width(width: u32) -> Self {
        if width < 768 {
            DeviceClass::Mobile
        } else if width < 1024 {
            DeviceClass::Tablet
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn bezel(&self) -> u32 {
        match self {
            DeviceClass::Mobile => 10,
            DeviceClass::Tablet => 12,
            DeviceClass::Desktop => 16,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportRender {
    pub device_class: DeviceClass,
    pub bezel: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub scale: f64,
    pub embed_src: String,
    /// Changes whenever the embedded context must be re-created.
    pub mount_key: String,
    pub sandbox: &'static str,
    pub title: String,
}

impl ViewportRender {
    pub fn is_visible(&self) -> bool {
        self.scale > 0.0
    }
}

/// Where the embedded context loads from. Instrumented panels go through
/// the proxy unless the target is local, which the proxy cannot reach in a
/// hosted deployment.
pub fn embed_src(panel: &PanelState) -> String {
    let url = &panel.live_url;
    if panel.config.instrumentation_enabled && !is_local_target(url) {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("url", url)
            .append_pair("panelId", panel.id())
            .finish();
        format!("{PROXY_ROUTE}?{query}")
    } else {
        url.clone()
    }
}

pub fn mount_key(panel: &PanelState) -> String {
    format!("{}-{}", panel.id(), panel.config.refresh_epoch)
}

fn fit_scale(container_width: f64, container_height: f64, frame_width: u32, frame_height: u32) -> f64 {
    if frame_width == 0 || frame_height == 0 {
        return 0.0;
    }
    let scale = (container_width / frame_width as f64).min(container_height / frame_height as f64);
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        0.0
    }
}

pub fn render(panel: &PanelState, container_width: f64, container_height: f64) -> ViewportRender {
    let device_class = DeviceClass::for_width(panel.config.width);
    let bezel = device_class.bezel();
    let frame_width = panel.config.width.saturating_add(bezel * 2);
    let frame_height = panel.config.height.saturating_add(bezel * 2);

    ViewportRender {
        device_class,
        bezel,
        frame_width,
        frame_height,
        scale: fit_scale(container_width, container_height, frame_width, frame_height),
        embed_src: embed_src(panel),
        mount_key: mount_key(panel),
        sandbox: EMBED_SANDBOX,
        title: panel.config.title.clone(),
    }
}

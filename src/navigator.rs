//! Tracks which section is "active" for step navigation and auto-scroll.
//!
//! Geometry comes from the render layer through [`ScrollSurface`]; all
//! coordinates are in the same space (e.g. client pixels), y growing down.

use crate::keys::SectionKey;
use crate::session::SessionStore;
use std::time::Duration;
use tracing::{debug, warn};

/// Vertical extent of a viewport or a rendered section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// At least partially inside `other`
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.top < other.bottom() && self.bottom() > other.top
    }
}

/// Where a section is currently rendered
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub key: SectionKey,
    pub rect: Rect,
}

/// Render-layer collaborator owning the scroll container
pub trait ScrollSurface {
    fn viewport(&self) -> Rect;
    fn scroll_top(&self) -> f64;
    /// Rendered anchors in document order
    fn anchors(&self) -> Vec<Anchor>;
    fn scroll_to(&mut self, offset: f64);

    fn anchor(&self, key: &SectionKey) -> Option<Rect> {
        self.anchors()
            .into_iter()
            .find(|anchor| &anchor.key == key)
            .map(|anchor| anchor.rect)
    }
}

/// Key of the visible anchor whose center is nearest the viewport center.
/// On equal distance the earlier anchor wins.
pub fn closest_section<'a>(viewport: &Rect, anchors: &'a [Anchor]) -> Option<&'a SectionKey> {
    let middle = viewport.center();
    let mut best: Option<(&SectionKey, f64)> = None;

    for anchor in anchors.iter().filter(|a| a.rect.overlaps(viewport)) {
        let distance = (anchor.rect.center() - middle).abs();
        if best.map_or(true, |(_, closest)| distance < closest) {
            best = Some((&anchor.key, distance));
        }
    }

    best.map(|(key, _)| key)
}

/// Scroll offset that puts `target` in the middle of the viewport
pub fn centered_offset(scroll_top: f64, viewport: &Rect, target: &Rect) -> f64 {
    let offset = scroll_top + target.top - viewport.top - viewport.height / 2.0 + target.height / 2.0;
    offset.max(0.0)
}

#[derive(Debug, Default)]
pub struct ActiveSectionTracker {
    active: Option<SectionKey>,
}

impl ActiveSectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&SectionKey> {
        self.active.as_ref()
    }

    pub fn set_active(&mut self, key: SectionKey) {
        self.active = Some(key);
    }

    /// Whether `key` is the active section, comparing base keys when either
    /// side has no message scope
    pub fn is_active(&self, key: &SectionKey) -> bool {
        match &self.active {
            Some(active) if active == key => true,
            Some(active) if !active.is_scoped() || !key.is_scoped() => active.base() == key.base(),
            _ => false,
        }
    }

    /// Recompute from scroll geometry. Keeps the previous value when nothing
    /// is visible.
    pub fn on_scroll(&mut self, viewport: &Rect, anchors: &[Anchor]) -> Option<&SectionKey> {
        if let Some(key) = closest_section(viewport, anchors) {
            if self.active.as_ref() != Some(key) {
                debug!("Active section -> {}", key);
            }
            self.active = Some(*key);
        }
        self.active.as_ref()
    }
}

/// Jump-to-section behaviour for the step navigator
pub struct SectionNavigator {
    tracker: ActiveSectionTracker,
    settle_delay: Duration,
}

impl SectionNavigator {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            tracker: ActiveSectionTracker::new(),
            settle_delay,
        }
    }

    pub fn tracker(&self) -> &ActiveSectionTracker {
        &self.tracker
    }

    pub fn on_scroll<S: ScrollSurface>(&mut self, surface: &S) -> Option<&SectionKey> {
        let viewport = surface.viewport();
        let anchors = surface.anchors();
        self.tracker.on_scroll(&viewport, &anchors)
    }

    /// Expand the target, mark it active, wait for layout to settle, then
    /// center it. Returns the offset scrolled to, or `None` if the section
    /// is not rendered.
    pub async fn scroll_to_section<S: ScrollSurface>(
        &mut self,
        store: &mut SessionStore,
        surface: &mut S,
        key: &SectionKey,
    ) -> Option<f64> {
        store.expand(key);
        // Scroll-driven recomputation can disagree while the scroll animates
        self.tracker.set_active(*key);

        tokio::time::sleep(self.settle_delay).await;

        let Some(target) = surface.anchor(key) else {
            warn!("Section {} is not rendered", key);
            return None;
        };
        let offset = centered_offset(surface.scroll_top(), &surface.viewport(), &target);
        surface.scroll_to(offset);
        Some(offset)
    }
}

//! Proportional scroll mapping between the editor and the preview.
//!
//! Both panes are reduced to a 0..1 ratio of scrollable distance.
//! Programmatic scrolls echo back as scroll events from the other
//! pane, so [`SyncLock`] suppresses the opposite direction for a short
//! window after either side drives a sync.

use std::time::Duration;

use web_time::Instant;

/// How long a sync from one pane suppresses the other.
pub const SUPPRESS_WINDOW: Duration = Duration::from_millis(100);

/// Fraction of scrollable distance consumed, clamped to 0..1. A pane
/// with no scrollable distance reports 0.
pub fn ratio(offset: f64, scroll_height: f64, client_height: f64) -> f64 {
    let scrollable = scroll_height - client_height;
    if scrollable <= 0.0 {
        return 0.0;
    }
    (offset / scrollable).clamp(0.0, 1.0)
}

/// Offset that puts a pane at `ratio` of its scrollable distance.
pub fn apply(ratio: f64, scroll_height: f64, client_height: f64) -> f64 {
    let scrollable = (scroll_height - client_height).max(0.0);
    ratio.clamp(0.0, 1.0) * scrollable
}

/// The two sides of a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Editor,
    Preview,
}

/// Re-entrancy guard for scroll syncing.
///
/// While one pane holds the lock, sync attempts from the other pane
/// are rejected until the window expires. The holding pane may keep
/// driving (continuous scrolling re-arms the window).
pub struct SyncLock {
    window: Duration,
    held: Option<(Pane, Instant)>,
}

impl Default for SyncLock {
    fn default() -> Self {
        Self::with_window(SUPPRESS_WINDOW)
    }
}

impl SyncLock {
    pub fn with_window(window: Duration) -> Self {
        Self { window, held: None }
    }

    /// Try to drive a sync from `pane`. Returns false while the
    /// opposite pane's window is still open.
    pub fn try_acquire(&mut self, pane: Pane) -> bool {
        let now = Instant::now();
        if let Some((holder, since)) = self.held {
            if holder != pane && now.duration_since(since) < self.window {
                return false;
            }
        }
        self.held = Some((pane, now));
        true
    }

    /// Drop the lock immediately, regardless of holder or window.
    pub fn release(&mut self) {
        self.held = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_clamps_and_handles_unscrollable() {
        assert_eq!(ratio(0.0, 1000.0, 400.0), 0.0);
        assert_eq!(ratio(300.0, 1000.0, 400.0), 0.5);
        assert_eq!(ratio(600.0, 1000.0, 400.0), 1.0);
        assert_eq!(ratio(900.0, 1000.0, 400.0), 1.0);
        assert_eq!(ratio(50.0, 400.0, 400.0), 0.0);
        assert_eq!(ratio(50.0, 300.0, 400.0), 0.0);
    }

    #[test]
    fn test_apply_inverts_ratio() {
        let offset = 217.0;
        let r = ratio(offset, 1000.0, 400.0);
        assert!((apply(r, 1000.0, 400.0) - offset).abs() < 1e-9);
        assert_eq!(apply(1.5, 1000.0, 400.0), 600.0);
        assert_eq!(apply(-0.2, 1000.0, 400.0), 0.0);
        assert_eq!(apply(0.7, 300.0, 400.0), 0.0);
    }

    #[test]
    fn test_lock_suppresses_the_opposite_pane() {
        let mut lock = SyncLock::default();
        assert!(lock.try_acquire(Pane::Editor));
        assert!(!lock.try_acquire(Pane::Preview));
        // Same pane keeps driving.
        assert!(lock.try_acquire(Pane::Editor));
        lock.release();
        assert!(lock.try_acquire(Pane::Preview));
    }

    #[test]
    fn test_lock_expires_after_window() {
        let mut lock = SyncLock::with_window(Duration::from_millis(0));
        assert!(lock.try_acquire(Pane::Editor));
        assert!(lock.try_acquire(Pane::Preview));
    }
}

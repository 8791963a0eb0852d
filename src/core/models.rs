use super::automation::BrowserTabOperations;

/*
 * Core data model for tab inspection. Everything here is a point-in-time
 * snapshot: nothing is persisted across runs, and records from different
 * snapshots may describe the same live tab without being comparable by
 * value. Cross-snapshot identity goes through `IdentityToken`.
 */

/// Opaque identifier of a top-level native window. Stable for the lifetime
/// of the window; equality is handle identity, never navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Stable per-object identity of one live automation object. Two fetches of
/// the same logical tab yield equal tokens even when the transient reference
/// values differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityToken(pub usize);

/*
 * One open tab at the moment of enumeration. Owns its automation reference:
 * dropping the record releases the underlying cross-process reference
 * exactly once, which is what keeps the release discipline structural
 * rather than per-call-site bookkeeping.
 */
pub struct TabRecord {
    pub tab: Box<dyn BrowserTabOperations>,
    pub window: WindowHandle,
    /// Best-known location string; empty when every resolution strategy
    /// failed (such tabs are excluded from merge candidates).
    pub navigation_target: String,
}

impl std::fmt::Debug for TabRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabRecord")
            .field("window", &self.window)
            .field("navigation_target", &self.navigation_target)
            .field("identity", &self.tab.identity())
            .finish()
    }
}

/*
 * Result of one enumeration pass: the live tabs plus the distinct top-level
 * windows in first-seen order. The order is significant; `windows[0]` is the
 * designated primary window for merge operations.
 */
#[derive(Debug, Default)]
pub struct TabSnapshot {
    pub tabs: Vec<TabRecord>,
    pub windows: Vec<WindowHandle>,
}

impl TabSnapshot {
    pub fn primary_window(&self) -> Option<WindowHandle> {
        self.windows.first().copied()
    }

    /// Tabs belonging to one top-level window, in enumeration order.
    pub fn tabs_in(&self, window: WindowHandle) -> impl Iterator<Item = &TabRecord> {
        self.tabs.iter().filter(move |t| t.window == window)
    }

    /// Identity tokens of the tabs in `window`, skipping tabs whose identity
    /// query failed.
    pub fn identities_in(
        &self,
        window: WindowHandle,
    ) -> std::collections::HashSet<IdentityToken> {
        self.tabs_in(window).filter_map(|t| t.tab.identity()).collect()
    }
}

/// Aggregate outcome of a merge batch. Partial failure is normal; a failed
/// URL never aborts the batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub merged_count: usize,
    pub failed_urls: Vec<String>,
}

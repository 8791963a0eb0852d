use super::models::{IdentityToken, WindowHandle};
use std::collections::HashSet;
use std::time::Duration;

/*
 * This module defines the capability traits through which the rest of the
 * crate talks to the host file manager. The host exposes a dynamic-dispatch
 * automation surface; here it is narrowed to a fixed set of typed operations
 * (`BrowserTabOperations`, `WindowCollectionOperations`, `DesktopOperations`)
 * so the enumeration, synchronization and merge logic can be exercised
 * against an instrumented fake backend in tests. The Windows COM adapter in
 * the platform layer is the production implementation.
 */

/*
 * Defines custom error types for automation operations.
 * The taxonomy mirrors how failures are handled: initialization failures are
 * fatal to the process, enumeration failures degrade to "no data this round",
 * and navigation/launch failures are reported per item without retry.
 */
#[derive(Debug)]
pub enum AutomationError {
    /// The automation subsystem could not be brought up at all.
    Initialization(String),
    /// The window collection itself could not be queried.
    Enumeration(String),
    /// A navigate call on a captured tab returned failure.
    Navigation(String),
    /// Launching a fresh host process instance failed.
    Launch(String),
}

impl std::fmt::Display for AutomationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutomationError::Initialization(s) => write!(f, "Initialization failed: {s}"),
            AutomationError::Enumeration(s) => write!(f, "Enumeration failed: {s}"),
            AutomationError::Navigation(s) => write!(f, "Navigation failed: {s}"),
            AutomationError::Launch(s) => write!(f, "Launch failed: {s}"),
        }
    }
}

impl std::error::Error for AutomationError {}

pub type Result<T> = std::result::Result<T, AutomationError>;

/*
 * A structured folder identity as reported by the tab's active view.
 * `filesystem_path` is present for plain directories; virtual namespace
 * locations (Control Panel, This PC, network places) only carry an absolute
 * `parsing_name`. Both may be absent when the view refuses the query.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderLocation {
    pub filesystem_path: Option<String>,
    pub parsing_name: Option<String>,
}

/*
 * One live automation item: a single tab of a top-level file-manager window.
 * Implementations own a cross-process reference to the underlying automation
 * object and must release it exactly once when dropped. All queries are
 * best-effort; the item can disappear at any time, in which case they return
 * `None` (the caller skips the item rather than aborting).
 */
pub trait BrowserTabOperations {
    /// Stable token naming the underlying automation object, independent of
    /// how many times the object is re-fetched from the collection. `None`
    /// when the identity query fails; callers then fall back to the
    /// count-based heuristic.
    fn identity(&self) -> Option<IdentityToken>;

    /// Handle of the top-level window containing this tab. `None` for
    /// transient entries that are mid-close.
    fn top_level_window(&self) -> Option<WindowHandle>;

    /// Whether this item is a genuine file-manager view, as opposed to some
    /// other automation-capable surface registered in the same collection.
    fn is_file_manager(&self) -> bool;

    /// Structured folder identity of the tab's active view (resolution
    /// strategy 1).
    fn folder_view_location(&self) -> Option<FolderLocation>;

    /// The tab's generic location URL property (strategy 2).
    fn location_url(&self) -> Option<String>;

    /// The `Document.Folder.Self.Path` chain (strategy 3); raw, without
    /// namespace-prefix normalization.
    fn document_folder_path(&self) -> Option<String>;

    /// Drives the tab to `destination`. No retry on failure.
    fn navigate(&self, destination: &str) -> Result<()>;
}

/// Outcome of the event-driven wait for a newly registered window/tab.
pub enum RegistrationWait {
    /// A tab matching the target window appeared and was captured.
    Captured(Box<dyn BrowserTabOperations>),
    /// The deadline elapsed without a matching registration.
    TimedOut,
    /// The backend has no notification source; the caller must poll.
    Unsupported,
}

/*
 * The indexable collection of automation-controlled windows exposed by the
 * host. The collection is externally mutable at any time: the count can be
 * stale by the time an item is fetched, so `tab_at` reports per-item failure
 * as `None` instead of an error.
 */
pub trait WindowCollectionOperations {
    fn tab_count(&self) -> Result<usize>;

    fn tab_at(&self, index: usize) -> Option<Box<dyn BrowserTabOperations>>;

    /// Blocks (pumping the event loop where applicable) until the host
    /// reports a window registration that materializes as a tab of `target`
    /// not present in `baseline`, or until `timeout` elapses. Backends
    /// without a notification source keep the default impl.
    fn wait_for_registration(
        &self,
        target: WindowHandle,
        baseline: &HashSet<IdentityToken>,
        timeout: Duration,
    ) -> RegistrationWait {
        let _ = (target, baseline, timeout);
        RegistrationWait::Unsupported
    }
}

/*
 * Native windowing operations on the host UI surface. Separate from the
 * automation collection because these address HWNDs, not automation objects.
 */
pub trait DesktopOperations {
    /// Depth-first search of `window`'s descendants for the control hosting
    /// the tab strip. `None` on host versions without a tabbed UI.
    fn find_tab_host(&self, window: WindowHandle) -> Option<WindowHandle>;

    /// Fire-and-forget create-tab signal. There is no acknowledgment channel;
    /// absence of a new tab within the deadline is the only failure signal.
    fn request_new_tab(&self, tab_host: WindowHandle);

    /// Posts a close request. Asynchronous; closure is neither awaited nor
    /// verified.
    fn request_close(&self, window: WindowHandle);

    /// Launches a fresh host process instance showing `destination`.
    fn launch_window(&self, destination: &str) -> Result<()>;

    /// Title of a top-level window, for listing output.
    fn window_title(&self, window: WindowHandle) -> String;

    /// Process id owning a top-level window, for listing output.
    fn window_process_id(&self, window: WindowHandle) -> u32;

    /// Sleeps for one polling interval. On the trait so tests can run the
    /// polling loop without real delays.
    fn pause(&self, interval: Duration);
}

/*
 * This module consolidates the core, platform-agnostic logic of the tool:
 * the tab data model, the capability traits over the host automation surface
 * (`WindowCollectionOperations`, `BrowserTabOperations`, `DesktopOperations`),
 * the window/tab enumerator, the location resolver, the new-tab
 * synchronization engine and the merge/open-folder drivers. Everything here
 * runs against trait objects, so it is exercised on any platform through the
 * instrumented fake backend in `test_support`. Unit tests for the engine and
 * the merge driver live in `sync_engine_tests.rs` and `merge_tests.rs`.
 */
pub mod automation;
pub mod enumerator;
pub mod location;
pub mod merge;
pub mod models;
pub mod open_folder;
pub mod sync_engine;

#[cfg(test)]
pub mod test_support;


// Re-export key structures and enums
pub use models::{IdentityToken, MergeSummary, TabRecord, TabSnapshot, WindowHandle};

// Re-export the capability traits and their error taxonomy
pub use automation::{
    AutomationError, BrowserTabOperations, DesktopOperations, FolderLocation, RegistrationWait,
    WindowCollectionOperations,
};

pub use enumerator::collect_tabs;

pub use merge::{MergeError, merge_all};

pub use open_folder::{OpenFolderOutcome, open_in_tab};

pub use sync_engine::{DETECTION_TIMEOUT, NewTabError, POLL_INTERVAL, create_and_navigate};

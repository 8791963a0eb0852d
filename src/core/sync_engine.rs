use super::automation::{
    AutomationError, DesktopOperations, RegistrationWait, WindowCollectionOperations,
};
use super::enumerator::collect_tabs;
use super::models::WindowHandle;
use std::time::Duration;

/*
 * New-tab synchronization engine. The create-tab command is a
 * fire-and-forget signal with no acknowledgment and the created tab is not
 * returned to us, so the engine has to recognize the new tab by diffing the
 * collection against a baseline taken just before the signal. Detection is
 * event-driven where the backend supports window-registration
 * notifications, with bounded polling as the fallback. All waits share one
 * deadline; the engine never blocks unboundedly.
 */

/// Upper bound on how long a single create-and-navigate operation may wait
/// for the host to materialize the new tab.
pub const DETECTION_TIMEOUT: Duration = Duration::from_secs(8);

/// Interval between re-enumerations on the polling fallback path.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/*
 * Per-operation failure outcomes. `Timeout` is inherently ambiguous: the
 * host may have ignored the command or may simply be slow; there is no
 * channel that could distinguish the two.
 */
#[derive(Debug)]
pub enum NewTabError {
    /// No new tab was identified within the deadline.
    Timeout,
    /// The navigate call on the captured tab failed. Not retried.
    Navigation(AutomationError),
    /// The baseline snapshot could not be taken at all.
    Enumeration(AutomationError),
}

impl std::fmt::Display for NewTabError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NewTabError::Timeout => write!(f, "no new tab appeared within the deadline"),
            NewTabError::Navigation(e) => write!(f, "new tab could not be navigated: {e}"),
            NewTabError::Enumeration(e) => write!(f, "baseline enumeration failed: {e}"),
        }
    }
}

impl std::error::Error for NewTabError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NewTabError::Navigation(e) | NewTabError::Enumeration(e) => Some(e),
            NewTabError::Timeout => None,
        }
    }
}

/*
 * Creates a new tab in `window` (addressed through its `tab_host` control)
 * and drives it to `destination`.
 *
 * State machine: BASELINE (snapshot identities of the target window's tabs)
 * -> SIGNAL (send the create-tab command) -> DETECT (event wait, then
 * polling diff) -> NAVIGATE. Identification prefers the stable identity
 * token; when identities are unavailable it falls back to the count-based
 * heuristic, which is only sound because operations run sequentially and at
 * most one tab is being created at a time.
 */
pub fn create_and_navigate(
    collection: &dyn WindowCollectionOperations,
    desktop: &dyn DesktopOperations,
    window: WindowHandle,
    tab_host: WindowHandle,
    destination: &str,
) -> Result<(), NewTabError> {
    let baseline = collect_tabs(collection).map_err(NewTabError::Enumeration)?;
    let baseline_ids = baseline.identities_in(window);
    let baseline_count = baseline.tabs_in(window).count();
    // Release the baseline references before waiting; only the identity
    // tokens are needed from here on.
    drop(baseline);

    log::debug!(
        "SyncEngine: baseline for {window}: {baseline_count} tab(s), {} identit(ies); signaling {tab_host}",
        baseline_ids.len()
    );
    desktop.request_new_tab(tab_host);

    // Event-driven detection first. TimedOut still gets one final polling
    // pass so a tab that appeared just as the wait was cut off is not lost.
    let mut budget = DETECTION_TIMEOUT;
    match collection.wait_for_registration(window, &baseline_ids, DETECTION_TIMEOUT) {
        RegistrationWait::Captured(tab) => {
            log::debug!("SyncEngine: new tab in {window} captured via registration event");
            return tab.navigate(destination).map_err(NewTabError::Navigation);
        }
        RegistrationWait::TimedOut => budget = Duration::ZERO,
        RegistrationWait::Unsupported => {
            log::debug!("SyncEngine: no registration events available, polling");
        }
    }

    let mut waited = Duration::ZERO;
    loop {
        match collect_tabs(collection) {
            Ok(snapshot) => {
                let current: Vec<_> = snapshot.tabs_in(window).collect();

                let mut candidate = current.iter().find(|t| {
                    t.tab
                        .identity()
                        .is_some_and(|id| !baseline_ids.contains(&id))
                });
                if candidate.is_none() && current.len() > baseline_count {
                    // Identities unavailable; the host appends new tabs at
                    // the end, and exactly one creation is in flight.
                    log::debug!("SyncEngine: identifying new tab by count heuristic");
                    candidate = current.last();
                }

                if let Some(record) = candidate {
                    log::debug!(
                        "SyncEngine: new tab detected in {window}, navigating to {destination}"
                    );
                    return record
                        .tab
                        .navigate(destination)
                        .map_err(NewTabError::Navigation);
                }
            }
            Err(e) => {
                // The collection can be briefly unavailable while the host
                // is busy spawning the tab; keep polling until the deadline.
                log::warn!("SyncEngine: enumeration failed during detection: {e}");
            }
        }

        if waited >= budget {
            break;
        }
        desktop.pause(POLL_INTERVAL);
        waited += POLL_INTERVAL;
    }

    log::warn!("SyncEngine: timed out waiting for a new tab in {window}");
    Err(NewTabError::Timeout)
}

use super::automation::{AutomationError, DesktopOperations, WindowCollectionOperations};
use super::enumerator::collect_tabs;
use super::models::{MergeSummary, WindowHandle};
use super::sync_engine::create_and_navigate;
use std::collections::HashMap;

/*
 * Merge orchestration: move every tab of every secondary window into the
 * primary window (the first one seen during enumeration), then ask the
 * emptied secondary windows to close. Merges run strictly sequentially; the
 * detection strategy needs a clean baseline per operation, and concurrent
 * create commands could misattribute which new tab belongs to which request.
 */

#[derive(Debug)]
pub enum MergeError {
    /// The initial enumeration failed; there is nothing to merge against.
    Automation(AutomationError),
    /// The primary window has no tab-host control (host without tabbed UI).
    TabHostUnavailable(WindowHandle),
}

impl std::fmt::Display for MergeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeError::Automation(e) => write!(f, "{e}"),
            MergeError::TabHostUnavailable(w) => {
                write!(f, "no tab host control found in primary window {w}")
            }
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MergeError::Automation(e) => Some(e),
            MergeError::TabHostUnavailable(_) => None,
        }
    }
}

/*
 * Merges all secondary-window tabs into the primary window.
 *
 * The primary window is fixed at the snapshot taken here, even if new
 * windows appear while the merge runs. Tabs whose location could not be
 * resolved are excluded entirely (not counted as failures). A secondary
 * window is only asked to close once every one of its merge candidates
 * landed in the primary window; a window with a failed or unresolvable tab
 * stays open so nothing the user had is lost.
 */
pub fn merge_all(
    collection: &dyn WindowCollectionOperations,
    desktop: &dyn DesktopOperations,
) -> Result<MergeSummary, MergeError> {
    let snapshot = collect_tabs(collection).map_err(MergeError::Automation)?;

    let Some(primary) = snapshot.primary_window() else {
        log::info!("Merge: no file-manager windows detected");
        return Ok(MergeSummary::default());
    };

    // Secondary windows in first-seen order; close requests are issued in
    // this order so runs are reproducible.
    let secondary_windows: Vec<WindowHandle> = snapshot
        .windows
        .iter()
        .copied()
        .filter(|window| *window != primary)
        .collect();

    // (window, url) per candidate; windows with unresolvable tabs are marked
    // unmergeable up front so they are never closed.
    let mut candidates: Vec<(WindowHandle, String)> = Vec::new();
    let mut window_fully_merged: HashMap<WindowHandle, bool> = HashMap::new();
    for record in &snapshot.tabs {
        if record.window == primary {
            continue;
        }
        if record.navigation_target.is_empty() {
            log::warn!(
                "Merge: tab in {} has no resolvable location, leaving its window open",
                record.window
            );
            window_fully_merged.insert(record.window, false);
            continue;
        }
        window_fully_merged.entry(record.window).or_insert(true);
        candidates.push((record.window, record.navigation_target.clone()));
    }
    drop(snapshot);

    if candidates.is_empty() {
        log::info!("Merge: nothing to merge");
        return Ok(MergeSummary::default());
    }

    let Some(tab_host) = desktop.find_tab_host(primary) else {
        return Err(MergeError::TabHostUnavailable(primary));
    };

    log::info!(
        "Merge: moving {} tab(s) into primary window {primary}",
        candidates.len()
    );

    let mut summary = MergeSummary::default();
    for (source_window, url) in &candidates {
        match create_and_navigate(collection, desktop, primary, tab_host, url) {
            Ok(()) => {
                log::info!("Merge: moved {url}");
                summary.merged_count += 1;
            }
            Err(e) => {
                log::warn!("Merge: failed to move {url}: {e}");
                summary.failed_urls.push(url.clone());
                window_fully_merged.insert(*source_window, false);
            }
        }
    }

    for window in &secondary_windows {
        if window_fully_merged.get(window).copied().unwrap_or(false) {
            log::debug!("Merge: requesting close of vacated window {window}");
            desktop.request_close(*window);
        }
    }

    Ok(summary)
}

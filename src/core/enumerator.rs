use super::automation::{Result, WindowCollectionOperations};
use super::location::resolve_navigation_target;
use super::models::{TabRecord, TabSnapshot};

/*
 * Window/tab enumeration. Walks the host's indexable window collection and
 * produces a point-in-time snapshot of every genuine file-manager tab plus
 * the distinct top-level windows in first-seen order. The collection is
 * externally mutated at will (the user opens and closes windows while we
 * run), so every per-item failure is a silent skip; only total collection
 * unavailability is an error, and callers are expected to report that
 * upward rather than retry.
 */
pub fn collect_tabs(collection: &dyn WindowCollectionOperations) -> Result<TabSnapshot> {
    let count = collection.tab_count()?;
    let mut snapshot = TabSnapshot::default();

    for index in 0..count {
        // Items can close between the count query and this fetch.
        let Some(tab) = collection.tab_at(index) else {
            log::debug!("Enumerator: item {index} vanished mid-enumeration, skipping");
            continue;
        };

        // Other automation-aware processes register in the same collection;
        // only keep items backed by the host-browser service.
        if !tab.is_file_manager() {
            continue;
        }

        // No resolvable handle means the window is transient or closing.
        let Some(window) = tab.top_level_window() else {
            log::debug!("Enumerator: item {index} has no top-level handle, skipping");
            continue;
        };

        let navigation_target = resolve_navigation_target(tab.as_ref());

        if !snapshot.windows.contains(&window) {
            snapshot.windows.push(window);
        }
        snapshot.tabs.push(TabRecord {
            tab,
            window,
            navigation_target,
        });
    }

    log::debug!(
        "Enumerator: {} tab(s) across {} window(s)",
        snapshot.tabs.len(),
        snapshot.windows.len()
    );
    Ok(snapshot)
}

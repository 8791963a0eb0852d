use super::automation::{DesktopOperations, Result, WindowCollectionOperations};
use super::enumerator::collect_tabs;
use super::sync_engine::create_and_navigate;

/*
 * Open-folder flow: put `destination` into a new tab of the primary window
 * when one exists, otherwise (or when the tab flow fails) launch a fresh
 * host process instance showing the folder. The launch fallback makes this
 * operation succeed even on host versions where the create-tab command is a
 * silent no-op.
 */

/// How an open-folder request was ultimately satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFolderOutcome {
    MergedIntoExisting,
    LaunchedNewWindow,
}

pub fn open_in_tab(
    collection: &dyn WindowCollectionOperations,
    desktop: &dyn DesktopOperations,
    destination: &str,
) -> Result<OpenFolderOutcome> {
    // Enumeration failure here means the automation service is unavailable;
    // degrade to launching a new window rather than failing the request.
    let primary = match collect_tabs(collection) {
        Ok(snapshot) => snapshot.primary_window(),
        Err(e) => {
            log::warn!("OpenFolder: enumeration unavailable ({e}), launching new window");
            None
        }
    };

    let Some(primary) = primary else {
        log::info!("OpenFolder: no existing window, launching {destination}");
        desktop.launch_window(destination)?;
        return Ok(OpenFolderOutcome::LaunchedNewWindow);
    };

    let Some(tab_host) = desktop.find_tab_host(primary) else {
        log::warn!("OpenFolder: no tab host in {primary}, launching new window");
        desktop.launch_window(destination)?;
        return Ok(OpenFolderOutcome::LaunchedNewWindow);
    };

    match create_and_navigate(collection, desktop, primary, tab_host, destination) {
        Ok(()) => Ok(OpenFolderOutcome::MergedIntoExisting),
        Err(e) => {
            log::warn!("OpenFolder: tab flow failed ({e}), launching new window");
            desktop.launch_window(destination)?;
            Ok(OpenFolderOutcome::LaunchedNewWindow)
        }
    }
}

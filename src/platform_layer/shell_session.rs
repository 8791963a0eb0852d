use super::com::{
    ComApartment, get_property, invoke_method, variant_to_dispatch, variant_to_i64,
    variant_to_string,
};
use super::error::{PlatformError, Result as PlatformResult};
use crate::core::automation::{
    AutomationError, BrowserTabOperations, FolderLocation, RegistrationWait, Result,
    WindowCollectionOperations,
};
use crate::core::models::{IdentityToken, WindowHandle};
use std::collections::HashSet;
use std::ffi::c_void;
use std::time::Duration;
use windows::Win32::System::Com::{
    CLSCTX_ALL, CoCreateInstance, CoTaskMemFree, IDispatch, IServiceProvider,
};
use windows::Win32::UI::Shell::{
    IFolderView, IShellBrowser, IShellItem, IShellWindows, SIGDN, SIGDN_DESKTOPABSOLUTEPARSING,
    SIGDN_FILESYSPATH, ShellWindows,
};
use windows::core::{BSTR, GUID, IUnknown, Interface, VARIANT};

/*
 * Live connection to the desktop's window automation collection. The
 * collection enrolls every scripting-capable shell surface in the session
 * (file-manager tabs, but also browser-style windows and the desktop
 * itself), so each item is verified through the top-level-browser service
 * before it is treated as a tab.
 */

// SID_STopLevelBrowser from shlguid.h, used to tell real file-manager views
// apart from the other surfaces enrolled in the same collection.
const SID_S_TOP_LEVEL_BROWSER: GUID = GUID::from_u128(0x4C96BE40_915C_11CF_99D3_00AA004AE837);

pub struct ComShellSession {
    shell: IShellWindows,
    _apartment: ComApartment,
}

impl ComShellSession {
    /// Sets up the COM apartment and binds to the session-wide window
    /// collection. Fails when the shell is not running.
    pub fn connect() -> PlatformResult<Self> {
        let apartment = ComApartment::initialize()?;
        let shell: IShellWindows = unsafe { CoCreateInstance(&ShellWindows, None, CLSCTX_ALL) }
            .map_err(|e| {
                PlatformError::InitializationFailed(format!(
                    "window automation collection unavailable: {:?}",
                    e
                ))
            })?;
        Ok(Self {
            shell,
            _apartment: apartment,
        })
    }
}

impl WindowCollectionOperations for ComShellSession {
    fn tab_count(&self) -> Result<usize> {
        let count = unsafe { self.shell.Count() }
            .map_err(|e| AutomationError::Enumeration(format!("{:?}", e)))?;
        Ok(count.max(0) as usize)
    }

    fn tab_at(&self, index: usize) -> Option<Box<dyn BrowserTabOperations>> {
        let dispatch = unsafe { self.shell.Item(&VARIANT::from(index as i32)) }.ok()?;
        Some(Box::new(ShellBrowserTab::new(dispatch)))
    }

    fn wait_for_registration(
        &self,
        target: WindowHandle,
        baseline: &HashSet<IdentityToken>,
        timeout: Duration,
    ) -> RegistrationWait {
        super::events::wait_for_registration(&self.shell, target, baseline, timeout)
    }
}

/*
 * One item of the collection: a cross-process reference to a single tab's
 * automation object. All queries are late-bound; the typed shell interfaces
 * only come into play for the folder-view walk. The COM reference is
 * released when the value drops.
 */
pub(crate) struct ShellBrowserTab {
    dispatch: IDispatch,
}

impl ShellBrowserTab {
    pub(crate) fn new(dispatch: IDispatch) -> Self {
        Self { dispatch }
    }

    fn top_level_browser(&self) -> Option<IShellBrowser> {
        let provider = self.dispatch.cast::<IServiceProvider>().ok()?;
        unsafe { provider.QueryService(&SID_S_TOP_LEVEL_BROWSER) }.ok()
    }
}

impl BrowserTabOperations for ShellBrowserTab {
    fn identity(&self) -> Option<IdentityToken> {
        // COM identity rule: the canonical IUnknown pointer is the same for
        // every interface fetched from the same object.
        let unknown = self.dispatch.cast::<IUnknown>().ok()?;
        Some(IdentityToken(unknown.as_raw() as usize))
    }

    fn top_level_window(&self) -> Option<WindowHandle> {
        let value = get_property(&self.dispatch, "HWND")?;
        let raw = variant_to_i64(&value)?;
        (raw != 0).then_some(WindowHandle(raw as isize))
    }

    fn is_file_manager(&self) -> bool {
        self.top_level_browser().is_some()
    }

    fn folder_view_location(&self) -> Option<FolderLocation> {
        let browser = self.top_level_browser()?;
        unsafe {
            let view = browser.QueryActiveShellView().ok()?;
            let folder_view: IFolderView = view.cast().ok()?;
            let folder: IShellItem = folder_view.GetFolder().ok()?;
            let location = FolderLocation {
                filesystem_path: item_display_name(&folder, SIGDN_FILESYSPATH),
                parsing_name: item_display_name(&folder, SIGDN_DESKTOPABSOLUTEPARSING),
            };
            (location.filesystem_path.is_some() || location.parsing_name.is_some())
                .then_some(location)
        }
    }

    fn location_url(&self) -> Option<String> {
        let value = get_property(&self.dispatch, "LocationURL")?;
        variant_to_string(&value).filter(|url| !url.is_empty())
    }

    fn document_folder_path(&self) -> Option<String> {
        // Document.Folder.Self.Path, the last-resort strategy for virtual
        // locations whose URL property comes back empty.
        let document = get_property(&self.dispatch, "Document")
            .as_ref()
            .and_then(variant_to_dispatch)?;
        let folder = get_property(&document, "Folder")
            .as_ref()
            .and_then(variant_to_dispatch)?;
        let folder_item = get_property(&folder, "Self")
            .as_ref()
            .and_then(variant_to_dispatch)?;
        let path = get_property(&folder_item, "Path")
            .as_ref()
            .and_then(variant_to_string)?;
        (!path.is_empty()).then_some(path)
    }

    fn navigate(&self, destination: &str) -> Result<()> {
        let mut args = [VARIANT::from(BSTR::from(destination))];
        invoke_method(&self.dispatch, "Navigate2", &mut args)
            .map_err(|e| AutomationError::Navigation(format!("{:?}", e)))
    }
}

unsafe fn item_display_name(item: &IShellItem, form: SIGDN) -> Option<String> {
    let pwstr = unsafe { item.GetDisplayName(form) }.ok()?;
    let text = unsafe { pwstr.to_string() }.ok();
    unsafe { CoTaskMemFree(Some(pwstr.as_ptr() as *const c_void)) };
    text.filter(|s| !s.is_empty())
}

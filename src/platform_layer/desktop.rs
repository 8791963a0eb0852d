use crate::core::automation::{AutomationError, DesktopOperations, Result};
use crate::core::models::WindowHandle;
use std::ffi::c_void;
use std::time::Duration;
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::Shell::ShellExecuteW;
use windows::Win32::UI::WindowsAndMessaging::{
    EnumChildWindows, GetClassNameW, GetWindowTextW, GetWindowThreadProcessId, PostMessageW,
    SW_SHOWNORMAL, SendMessageW, WM_CLOSE, WM_COMMAND,
};
use windows::core::{BOOL, HSTRING, PCWSTR, w};

/*
 * Raw windowing operations. The automation collection addresses tabs as COM
 * objects; everything here instead addresses the native windows those tabs
 * live in: locating the tab-strip control, sending it the create-tab
 * command, posting close requests and launching a fresh process instance.
 */

// Command id the tab-strip control interprets as "open a new tab".
// Undocumented and subject to change in a future host version; when it stops
// working the create-tab flow times out and callers fall back to launching a
// new window.
const NEW_TAB_COMMAND_ID: usize = 0xA21B;

// Window class of the control hosting the tab strip inside a top-level
// file-manager window.
const TAB_HOST_CLASS: &str = "ShellTabWindowClass";

pub struct Win32Desktop;

impl Win32Desktop {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Win32Desktop {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopOperations for Win32Desktop {
    fn find_tab_host(&self, window: WindowHandle) -> Option<WindowHandle> {
        let mut found: Option<HWND> = None;
        unsafe {
            // EnumChildWindows walks all descendants, not just direct
            // children. Returns FALSE when the callback stops the walk early,
            // so the result is deliberately ignored.
            let _ = EnumChildWindows(
                Some(as_hwnd(window)),
                Some(find_tab_host_proc),
                LPARAM(&mut found as *mut Option<HWND> as isize),
            );
        }
        found.map(|hwnd| WindowHandle(hwnd.0 as isize))
    }

    fn request_new_tab(&self, tab_host: WindowHandle) {
        log::debug!("Desktop: sending create-tab command to {tab_host}");
        unsafe {
            SendMessageW(
                as_hwnd(tab_host),
                WM_COMMAND,
                Some(WPARAM(NEW_TAB_COMMAND_ID)),
                Some(LPARAM(0)),
            );
        }
    }

    fn request_close(&self, window: WindowHandle) {
        log::debug!("Desktop: posting close request to {window}");
        if let Err(e) = unsafe { PostMessageW(Some(as_hwnd(window)), WM_CLOSE, WPARAM(0), LPARAM(0)) }
        {
            log::warn!("Desktop: close request for {window} failed: {:?}", e);
        }
    }

    fn launch_window(&self, destination: &str) -> Result<()> {
        let target = HSTRING::from(destination);
        let instance = unsafe {
            ShellExecuteW(
                None,
                w!("open"),
                PCWSTR(target.as_ptr()),
                PCWSTR::null(),
                PCWSTR::null(),
                SW_SHOWNORMAL,
            )
        };
        // Values at or below 32 are error codes.
        if instance.0 as isize <= 32 {
            return Err(AutomationError::Launch(format!(
                "ShellExecuteW returned {}",
                instance.0 as isize
            )));
        }
        Ok(())
    }

    fn window_title(&self, window: WindowHandle) -> String {
        let mut buffer = [0u16; 512];
        let len = unsafe { GetWindowTextW(as_hwnd(window), &mut buffer) };
        String::from_utf16_lossy(&buffer[..len.max(0) as usize])
    }

    fn window_process_id(&self, window: WindowHandle) -> u32 {
        let mut pid = 0u32;
        unsafe {
            GetWindowThreadProcessId(as_hwnd(window), Some(&mut pid));
        }
        pid
    }

    fn pause(&self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

fn as_hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut c_void)
}

unsafe extern "system" fn find_tab_host_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let found = unsafe { &mut *(lparam.0 as *mut Option<HWND>) };
    let mut class_buffer = [0u16; 256];
    let len = unsafe { GetClassNameW(hwnd, &mut class_buffer) };
    if len > 0 && String::from_utf16_lossy(&class_buffer[..len as usize]) == TAB_HOST_CLASS {
        *found = Some(hwnd);
        return BOOL(0);
    }
    BOOL(1)
}

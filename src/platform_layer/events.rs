use super::shell_session::ShellBrowserTab;
use crate::core::automation::{BrowserTabOperations, RegistrationWait};
use crate::core::models::{IdentityToken, WindowHandle};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use windows::Win32::Foundation::E_NOTIMPL;
use windows::Win32::System::Com::{
    DISPATCH_FLAGS, DISPPARAMS, EXCEPINFO, IConnectionPoint, IConnectionPointContainer, IDispatch,
    IDispatch_Impl, ITypeInfo,
};
use windows::Win32::UI::Shell::IShellWindows;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, MSG, PM_REMOVE, PeekMessageW, TranslateMessage,
};
use windows::core::{GUID, Interface, PCWSTR, VARIANT, implement};

/*
 * Event-driven detection of a newly registered window or tab. The collection
 * publishes registration notifications through a connection point; the sink
 * here is a minimal late-bound event receiver that, on each notification,
 * re-enumerates the collection and captures the first tab of the target
 * window whose identity is outside the baseline. Notifications arrive on the
 * registering apartment's thread via the message queue, so the wait has to
 * pump messages.
 */

// DIID_DShellWindowsEvents from exdisp.h.
const DIID_SHELL_WINDOWS_EVENTS: GUID = GUID::from_u128(0xFE4106E0_399A_11D0_A48C_00A0C90A8F39);

// Dispatch id of the window-registered notification on that event interface.
const DISPID_WINDOW_REGISTERED: i32 = 200;

// Pump granularity while waiting for a notification.
const PUMP_INTERVAL: Duration = Duration::from_millis(25);

type CaptureSlot = Arc<Mutex<Option<ShellBrowserTab>>>;

#[implement(IDispatch)]
struct RegistrationSink {
    shell: IShellWindows,
    target: WindowHandle,
    baseline: HashSet<IdentityToken>,
    slot: CaptureSlot,
}

impl RegistrationSink {
    fn on_window_registered(&self) {
        let Ok(mut slot) = self.slot.lock() else {
            return;
        };
        // First capture wins; later notifications for the same creation are
        // ignored.
        if slot.is_some() {
            return;
        }
        // The notification does not carry the registered object, so re-scan
        // the collection for a tab of the target window outside the baseline.
        if let Some(tab) = find_new_tab(&self.shell, self.target, &self.baseline) {
            log::debug!(
                "Events: registration notification matched a new tab in {}",
                self.target
            );
            *slot = Some(tab);
        }
    }
}

impl IDispatch_Impl for RegistrationSink_Impl {
    fn GetTypeInfoCount(&self) -> windows::core::Result<u32> {
        Ok(0)
    }

    fn GetTypeInfo(&self, _itinfo: u32, _lcid: u32) -> windows::core::Result<ITypeInfo> {
        Err(E_NOTIMPL.into())
    }

    fn GetIDsOfNames(
        &self,
        _riid: *const GUID,
        _rgsznames: *const PCWSTR,
        _cnames: u32,
        _lcid: u32,
        _rgdispid: *mut i32,
    ) -> windows::core::Result<()> {
        Err(E_NOTIMPL.into())
    }

    fn Invoke(
        &self,
        dispidmember: i32,
        _riid: *const GUID,
        _lcid: u32,
        _wflags: DISPATCH_FLAGS,
        _pdispparams: *const DISPPARAMS,
        _pvarresult: *mut VARIANT,
        _pexcepinfo: *mut EXCEPINFO,
        _puargerr: *mut u32,
    ) -> windows::core::Result<()> {
        if dispidmember == DISPID_WINDOW_REGISTERED {
            self.on_window_registered();
        }
        // Every other event on the interface is uninteresting; a sink must
        // still accept them.
        Ok(())
    }
}

fn find_new_tab(
    shell: &IShellWindows,
    target: WindowHandle,
    baseline: &HashSet<IdentityToken>,
) -> Option<ShellBrowserTab> {
    let count = unsafe { shell.Count() }.ok()?.max(0) as usize;
    for index in 0..count {
        let Ok(dispatch) = (unsafe { shell.Item(&VARIANT::from(index as i32)) }) else {
            continue;
        };
        let tab = ShellBrowserTab::new(dispatch);
        if !tab.is_file_manager() || tab.top_level_window() != Some(target) {
            continue;
        }
        match tab.identity() {
            Some(id) if !baseline.contains(&id) => return Some(tab),
            _ => {}
        }
    }
    None
}

/// Subscribes to registration notifications and pumps the message queue
/// until a matching tab is captured or `timeout` elapses. Returns
/// `Unsupported` when the collection exposes no usable connection point, in
/// which case the caller falls back to polling.
pub(crate) fn wait_for_registration(
    shell: &IShellWindows,
    target: WindowHandle,
    baseline: &HashSet<IdentityToken>,
    timeout: Duration,
) -> RegistrationWait {
    let Ok(container) = shell.cast::<IConnectionPointContainer>() else {
        log::debug!("Events: collection has no connection point container");
        return RegistrationWait::Unsupported;
    };
    let point: IConnectionPoint =
        match unsafe { container.FindConnectionPoint(&DIID_SHELL_WINDOWS_EVENTS) } {
            Ok(point) => point,
            Err(e) => {
                log::debug!("Events: no registration connection point: {:?}", e);
                return RegistrationWait::Unsupported;
            }
        };

    let slot: CaptureSlot = Arc::new(Mutex::new(None));
    let sink: IDispatch = RegistrationSink {
        shell: shell.clone(),
        target,
        baseline: baseline.clone(),
        slot: Arc::clone(&slot),
    }
    .into();
    let cookie = match unsafe { point.Advise(&sink) } {
        Ok(cookie) => cookie,
        Err(e) => {
            log::debug!("Events: Advise failed: {:?}", e);
            return RegistrationWait::Unsupported;
        }
    };

    let deadline = Instant::now() + timeout;
    let captured = loop {
        pump_pending_messages();
        if let Some(tab) = slot.lock().ok().and_then(|mut guard| guard.take()) {
            break Some(tab);
        }
        if Instant::now() >= deadline {
            break None;
        }
        std::thread::sleep(PUMP_INTERVAL);
    };

    if let Err(e) = unsafe { point.Unadvise(cookie) } {
        log::warn!("Events: Unadvise failed: {:?}", e);
    }
    // A notification may have landed between the last take and Unadvise;
    // drain the slot so the captured reference is released here.
    if captured.is_none() {
        if let Ok(mut guard) = slot.lock() {
            guard.take();
        }
    }

    match captured {
        Some(tab) => RegistrationWait::Captured(Box::new(tab)),
        None => RegistrationWait::TimedOut,
    }
}

fn pump_pending_messages() {
    unsafe {
        let mut msg = MSG::default();
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

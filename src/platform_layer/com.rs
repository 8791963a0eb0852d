use super::error::{PlatformError, Result as PlatformResult};
use windows::Win32::Foundation::{RPC_E_CHANGED_MODE, S_FALSE};
use windows::Win32::System::Com::{
    COINIT_APARTMENTTHREADED, CoInitializeEx, CoUninitialize, DISPATCH_METHOD,
    DISPATCH_PROPERTYGET, DISPPARAMS, IDispatch,
};
use windows::core::{BSTR, GUID, PCWSTR, VARIANT};

/*
 * COM plumbing shared by the rest of the platform layer: the apartment
 * guard, and the late-bound property/method helpers used to talk to the
 * automation objects. The file manager's per-tab objects are only reliably
 * scriptable through `IDispatch`, so every property walk here goes through
 * `GetIDsOfNames` + `Invoke` rather than a typed interface.
 */

// LOCALE_USER_DEFAULT from winnls.h; the dispatch helpers are the only users.
const LOCALE_USER_DEFAULT: u32 = 0x0400;

/*
 * Scopes a single-threaded COM apartment to the lifetime of the value.
 * `S_FALSE` (already initialized) and `RPC_E_CHANGED_MODE` (initialized in a
 * different mode by the embedder) are tolerated, matching how the rest of
 * the process-wide state is treated as shared.
 */
pub struct ComApartment {
    initialized: bool,
}

impl ComApartment {
    pub fn initialize() -> PlatformResult<Self> {
        unsafe {
            let hr = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
            if hr.is_err() && hr != S_FALSE && hr != RPC_E_CHANGED_MODE {
                return Err(PlatformError::InitializationFailed(format!(
                    "CoInitializeEx failed: {:?}",
                    hr
                )));
            }
            // RPC_E_CHANGED_MODE means we did not initialize and must not
            // balance with CoUninitialize.
            Ok(Self {
                initialized: hr != RPC_E_CHANGED_MODE,
            })
        }
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.initialized {
            unsafe { CoUninitialize() };
        }
    }
}

fn dispid_of(dispatch: &IDispatch, name: &str) -> windows::core::Result<i32> {
    let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
    let names = [PCWSTR(wide.as_ptr())];
    let mut dispid = 0i32;
    unsafe {
        dispatch.GetIDsOfNames(
            &GUID::zeroed(),
            names.as_ptr(),
            1,
            LOCALE_USER_DEFAULT,
            &mut dispid,
        )?;
    }
    Ok(dispid)
}

/// Reads a named property via late binding. Any failure (unknown name,
/// invoke error) collapses to `None`; the automation object may have gone
/// away or simply not support the property on this host version.
pub(crate) fn get_property(dispatch: &IDispatch, name: &str) -> Option<VARIANT> {
    let dispid = dispid_of(dispatch, name).ok()?;
    let params = DISPPARAMS::default();
    let mut result = VARIANT::new();
    unsafe {
        dispatch
            .Invoke(
                dispid,
                &GUID::zeroed(),
                LOCALE_USER_DEFAULT,
                DISPATCH_PROPERTYGET,
                &params,
                Some(&mut result as *mut VARIANT),
                None,
                None,
            )
            .ok()?;
    }
    Some(result)
}

/// Invokes a named method via late binding. `args` must already be in the
/// reversed order `DISPPARAMS` expects.
pub(crate) fn invoke_method(
    dispatch: &IDispatch,
    name: &str,
    args: &mut [VARIANT],
) -> windows::core::Result<()> {
    let dispid = dispid_of(dispatch, name)?;
    let params = DISPPARAMS {
        rgvarg: args.as_mut_ptr(),
        rgdispidNamedArgs: std::ptr::null_mut(),
        cArgs: args.len() as u32,
        cNamedArgs: 0,
    };
    unsafe {
        dispatch.Invoke(
            dispid,
            &GUID::zeroed(),
            LOCALE_USER_DEFAULT,
            DISPATCH_METHOD,
            &params,
            None,
            None,
            None,
        )
    }
}

pub(crate) fn variant_to_string(value: &VARIANT) -> Option<String> {
    BSTR::try_from(value).ok().map(|b| b.to_string())
}

pub(crate) fn variant_to_i64(value: &VARIANT) -> Option<i64> {
    i64::try_from(value).ok()
}

pub(crate) fn variant_to_dispatch(value: &VARIANT) -> Option<IDispatch> {
    IDispatch::try_from(value).ok()
}

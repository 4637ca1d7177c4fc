//! Headless core of the in-game hacking device overlay. The host shell
//! (game client) owns the actual window and input plumbing; it feeds every
//! user gesture and server event through [`dispatch_message`] as a JSON
//! command and redraws from the JSON widget tree that comes back.
//!
//! Outbound traffic to the game server goes through the [`backend::Backend`]
//! trait, installed once at startup with [`backend::set_backend`].

use std::ffi::{c_char, CStr, CString};

rust_i18n::i18n!("locales", fallback = "en");

pub mod backend;
pub mod challenge;
mod features;
mod i18n;
mod router;
mod state;
mod ui;

pub use backend::{set_backend, ActionResponse, Backend, BatteryResponse, LookupResponse};
pub use challenge::{ActionPolicy, Challenge, ChallengeOutcome};
pub use router::dispatch_message;

/// C ABI entry point for embedders that load the core as a shared library.
/// Takes a NUL-terminated JSON command and returns a heap-allocated JSON
/// string; the caller must release it with [`hackerjob_free`].
///
/// # Safety
/// `input` must point to a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn hackerjob_dispatch(input: *const c_char) -> *mut c_char {
    let response = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        if input.is_null() {
            return router::error_ui("null_input").to_string();
        }
        let input_str = match CStr::from_ptr(input).to_str() {
            Ok(s) => s,
            Err(_) => return router::error_ui("invalid_utf8").to_string(),
        };
        dispatch_message(input_str)
    }));

    let rendered = match response {
        Ok(rendered) => rendered,
        Err(_) => router::error_ui("panic").to_string(),
    };

    match CString::new(rendered) {
        Ok(cstring) => cstring.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Releases a string returned by [`hackerjob_dispatch`].
///
/// # Safety
/// `ptr` must have come from [`hackerjob_dispatch`] and not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn hackerjob_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

//! Marshaling between Rust values and the host's C callbacks.

use fcitx_bridge_core::{HostNotifier, LogSink};
use std::ffi::{c_char, CStr, CString};
use std::path::PathBuf;
use std::ptr;

/// Receives engine notifications: `argv` holds `argc` NUL-terminated UTF-8
/// strings that stay valid until the call returns.
pub type HostEventFn = extern "C" fn(kind: i32, argv: *const *const c_char, argc: usize);

/// Receives one log line under a tag.
pub type HostLogFn = extern "C" fn(tag: *const c_char, msg: *const c_char);

/// Convert to a C string, dropping interior NUL bytes.
pub fn to_c_string(s: &str) -> CString {
    let bytes: Vec<u8> = s.bytes().filter(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default()
}

/// Borrow a host string. `None` for null pointers and invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub unsafe fn borrow_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Read a host path. `None` for null pointers and empty strings.
///
/// # Safety
/// Same contract as [`borrow_str`].
pub unsafe fn path_arg(ptr: *const c_char) -> Option<PathBuf> {
    if ptr.is_null() {
        return None;
    }
    let bytes = CStr::from_ptr(ptr).to_bytes();
    if bytes.is_empty() {
        return None;
    }
    #[cfg(unix)]
    {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        Some(PathBuf::from(OsStr::from_bytes(bytes)))
    }
    #[cfg(not(unix))]
    {
        Some(PathBuf::from(String::from_utf8_lossy(bytes).into_owned()))
    }
}

/// Forwards notifications to a host function pointer.
///
/// The argument array and its strings are built per call and freed once the
/// host returns.
#[derive(Clone, Copy)]
pub struct CHostNotifier {
    callback: HostEventFn,
}

impl CHostNotifier {
    pub fn new(callback: HostEventFn) -> Self {
        Self { callback }
    }
}

impl HostNotifier for CHostNotifier {
    fn on_event(&self, kind: i32, args: &[String]) {
        let strings: Vec<CString> = args.iter().map(|s| to_c_string(s)).collect();
        let argv: Vec<*const c_char> = strings.iter().map(|s| s.as_ptr()).collect();
        let argv_ptr = if argv.is_empty() {
            ptr::null()
        } else {
            argv.as_ptr()
        };
        (self.callback)(kind, argv_ptr, argv.len());
    }
}

/// Log sink backed by the host log function.
#[derive(Clone, Copy)]
pub struct CHostLog {
    callback: HostLogFn,
}

impl CHostLog {
    pub fn new(callback: HostLogFn) -> Self {
        Self { callback }
    }

    pub fn log(&self, tag: &str, message: &str) {
        let tag = to_c_string(tag);
        let message = to_c_string(message);
        (self.callback)(tag.as_ptr(), message.as_ptr());
    }
}

impl LogSink for CHostLog {
    fn write_line(&self, tag: &str, line: &str) {
        self.log(tag, line);
    }
}

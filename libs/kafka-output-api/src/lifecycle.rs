use std::ffi::CStr;
use std::os::raw::c_int;

/// Status returned to the host from `init` and `flush`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlbStatus {
    /// Hard failure. From `init`, the host disables the plugin instance.
    Error,
    Ok,
}

impl FlbStatus {
    pub fn as_raw(self) -> c_int {
        match self {
            FlbStatus::Error => crate::ffi::FLB_ERROR,
            FlbStatus::Ok => crate::ffi::FLB_OK,
        }
    }

    pub fn is_ok(self) -> bool {
        self == FlbStatus::Ok
    }
}

/// Identity announced to the host at registration.
#[derive(Debug, Clone, Copy)]
pub struct PluginInfo {
    pub name: &'static CStr,
    pub description: &'static CStr,
}

/// Host-driven output plugin lifecycle: register → init → flush* → exit.
///
/// `flush` may be called concurrently from several host worker threads, so
/// every method takes `&self`.
pub trait OutputPlugin: Send + Sync {
    /// Plugin identity. Always succeeds.
    fn register() -> PluginInfo
    where
        Self: Sized;

    /// One-time startup. Blocks until the plugin is ready or gives up.
    fn init(&self) -> FlbStatus;

    /// Deliver one batch of encoded records tagged with its source.
    fn flush(&self, data: &[u8], tag: &str) -> FlbStatus;

    /// Cleanup at host shutdown. Returns the host exit code.
    fn exit(&self) -> i32 {
        0
    }
}

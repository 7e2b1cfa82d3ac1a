//! C ABI boundary with the log-processor host.
//!
//! The host loads the plugin as a shared object and resolves four symbols:
//! `FLBPluginRegister`, `FLBPluginInit`, `FLBPluginFlush`, `FLBPluginExit`.
//! Plugins export them with [`flb_output_plugin!`](crate::flb_output_plugin).

use std::borrow::Cow;
use std::ffi::{CStr, c_void};
use std::os::raw::{c_char, c_int};
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::lifecycle::PluginInfo;

pub const FLB_ERROR: c_int = 0;
pub const FLB_OK: c_int = 1;
/// Host ABI value. Flushes here never ask for redelivery.
pub const FLB_RETRY: c_int = 2;

/// Proxy plugin type: output.
pub const FLB_PROXY_OUTPUT_PLUGIN: c_int = 2;
/// Proxy calling convention the host uses for externally built plugins.
pub const FLB_PROXY_GOLANG: c_int = 11;

/// Plugin definition filled in by `FLBPluginRegister`. Host-allocated.
#[repr(C)]
pub struct ProxyDef {
    pub plugin_type: c_int,
    pub proxy: c_int,
    pub flags: c_int,
    pub name: *const c_char,
    pub description: *const c_char,
}

/// Fill the host's plugin definition.
///
/// # Safety
/// `def` must be null or point to a writable `ProxyDef`.
pub unsafe fn register(def: *mut ProxyDef, info: &PluginInfo) -> c_int {
    let Some(def) = (unsafe { def.as_mut() }) else {
        return FLB_ERROR;
    };
    def.plugin_type = FLB_PROXY_OUTPUT_PLUGIN;
    def.proxy = FLB_PROXY_GOLANG;
    def.flags = 0;
    // 'static strings: the host keeps these pointers for the process lifetime.
    def.name = info.name.as_ptr();
    def.description = info.description.as_ptr();
    FLB_OK
}

/// Borrow the host's batch buffer.
///
/// # Safety
/// If `data` is non-null it must point to `length` readable bytes that stay
/// valid for `'a`.
pub unsafe fn batch_from_raw<'a>(data: *const c_void, length: c_int) -> &'a [u8] {
    match usize::try_from(length) {
        Ok(len) if len > 0 && !data.is_null() => unsafe {
            std::slice::from_raw_parts(data as *const u8, len)
        },
        _ => &[],
    }
}

/// Read the host's NUL-terminated tag.
///
/// # Safety
/// If `tag` is non-null it must point to a NUL-terminated string valid for `'a`.
pub unsafe fn tag_from_raw<'a>(tag: *const c_char) -> Cow<'a, str> {
    if tag.is_null() {
        return Cow::Borrowed("");
    }
    unsafe { CStr::from_ptr(tag) }.to_string_lossy()
}

/// Run a lifecycle callback, turning a panic into `FLB_ERROR`.
/// Unwinding across the C ABI is undefined behavior.
pub fn guard(callback: &str, f: impl FnOnce() -> c_int) -> c_int {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(code) => code,
        Err(_) => {
            tracing::error!(callback, "plugin panicked, reporting error to host");
            FLB_ERROR
        }
    }
}

/// Export the host lifecycle symbols for an [`OutputPlugin`](crate::lifecycle::OutputPlugin).
///
/// `$create` is a `fn() -> Result<$plugin_ty, PluginError>` called once, on
/// the first `FLBPluginInit`. Creation errors are reported as init failures.
///
/// ```ignore
/// kafka_output_api::flb_output_plugin!(KafkaOutput, create_plugin);
/// ```
#[macro_export]
macro_rules! flb_output_plugin {
    ($plugin_ty:ty, $create:path) => {
        static __FLB_PLUGIN: ::std::sync::OnceLock<$plugin_ty> = ::std::sync::OnceLock::new();

        /// # Safety
        /// `def` must be null or point to a host-allocated plugin definition.
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn FLBPluginRegister(
            def: *mut $crate::ffi::ProxyDef,
        ) -> ::std::os::raw::c_int {
            $crate::ffi::guard("FLBPluginRegister", || {
                let info = <$plugin_ty as $crate::lifecycle::OutputPlugin>::register();
                unsafe { $crate::ffi::register(def, &info) }
            })
        }

        /// # Safety
        /// Host context pointer; not dereferenced.
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn FLBPluginInit(
            _ctx: *mut ::std::ffi::c_void,
        ) -> ::std::os::raw::c_int {
            $crate::ffi::guard("FLBPluginInit", || {
                if __FLB_PLUGIN.get().is_none() {
                    match $create() {
                        Ok(plugin) => {
                            let _ = __FLB_PLUGIN.set(plugin);
                        }
                        Err(e) => {
                            $crate::tracing::error!(error = %e, "failed to create plugin");
                            return $crate::ffi::FLB_ERROR;
                        }
                    }
                }
                match __FLB_PLUGIN.get() {
                    Some(plugin) => $crate::lifecycle::OutputPlugin::init(plugin).as_raw(),
                    None => $crate::ffi::FLB_ERROR,
                }
            })
        }

        /// # Safety
        /// `data` must point to `length` readable bytes and `tag` to a
        /// NUL-terminated string, both valid for the duration of the call.
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn FLBPluginFlush(
            data: *const ::std::ffi::c_void,
            length: ::std::os::raw::c_int,
            tag: *const ::std::os::raw::c_char,
        ) -> ::std::os::raw::c_int {
            $crate::ffi::guard("FLBPluginFlush", || {
                let Some(plugin) = __FLB_PLUGIN.get() else {
                    $crate::tracing::error!("flush called before init");
                    return $crate::ffi::FLB_ERROR;
                };
                let batch = unsafe { $crate::ffi::batch_from_raw(data, length) };
                let tag = unsafe { $crate::ffi::tag_from_raw(tag) };
                $crate::lifecycle::OutputPlugin::flush(plugin, batch, &tag).as_raw()
            })
        }

        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub extern "C" fn FLBPluginExit() -> ::std::os::raw::c_int {
            $crate::ffi::guard("FLBPluginExit", || match __FLB_PLUGIN.get() {
                Some(plugin) => $crate::lifecycle::OutputPlugin::exit(plugin),
                None => 0,
            })
        }
    };
}

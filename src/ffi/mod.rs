//! FFI exports for C hosts
//!
//! All functions in this module are exported with `#[no_mangle]` and use
//! C-compatible types. A host engine creates a video texture against its
//! current GL context, advances it once per render tick and samples the GL
//! texture name it hands back. Every call for one handle must come from the
//! thread that owns that GL context.

use std::ffi::{c_char, c_void, CStr, CString};
use std::path::PathBuf;
use std::ptr;

use parking_lot::Mutex;

use crate::decoder::{BoxedLibrary, CodecLibrary, NativeCodec, StreamConfig, ViddecodeLibrary};
use crate::error::Error;
use crate::stream::VideoTexture;
use crate::texture::gl::texture_name;

// Thread-local error storage
thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<CString>> = std::cell::RefCell::new(None);
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

// =============================================================================
// Result Type
// =============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VtxResult {
    Success = 0,
    ErrorFileNotFound = 1,
    ErrorOpenFailed = 2,
    ErrorConversion = 3,
    ErrorMemory = 4,
    ErrorLibrary = 5,
    ErrorGraphics = 6,
    ErrorInvalidHandle = 7,
    ErrorInvalidConfig = 8,
    ErrorUnknown = 99,
}

impl From<Error> for VtxResult {
    fn from(e: Error) -> Self {
        set_last_error(&e.to_string());
        match e.to_ffi_code() {
            1 => VtxResult::ErrorFileNotFound,
            2 => VtxResult::ErrorOpenFailed,
            3 => VtxResult::ErrorConversion,
            4 => VtxResult::ErrorMemory,
            5 => VtxResult::ErrorLibrary,
            6 => VtxResult::ErrorGraphics,
            8 => VtxResult::ErrorInvalidConfig,
            _ => VtxResult::ErrorUnknown,
        }
    }
}

// =============================================================================
// Opaque Handle
// =============================================================================

type HostVideoTexture = VideoTexture<Box<dyn NativeCodec>, glow::Context>;

/// Opaque video texture handle
pub struct VtxVideoTextureHandle {
    texture: Mutex<HostVideoTexture>,
}

/// GL function loader supplied by the host (e.g. `glfwGetProcAddress`)
pub type VtxGlLoader =
    Option<unsafe extern "C" fn(name: *const c_char, user_data: *mut c_void) -> *const c_void>;

/// Stream counters for FFI
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VtxStreamStats {
    pub frames_delivered: u64,
    pub empty_pulls: u64,
    pub exhausted_ticks: u64,
    pub frames_uploaded: u64,
}

// =============================================================================
// Error Handling
// =============================================================================

/// Get last error message
#[no_mangle]
pub extern "C" fn vtx_get_last_error() -> *const c_char {
    LAST_ERROR.with(|e| e.borrow().as_ref().map(|s| s.as_ptr()).unwrap_or(ptr::null()))
}

/// Clear last error
#[no_mangle]
pub extern "C" fn vtx_clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Initialize the library (sets up logging).
/// Call once at application startup.
#[no_mangle]
pub extern "C" fn vtx_init() {
    crate::init();
}

static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Get library version
#[no_mangle]
pub extern "C" fn vtx_get_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

// =============================================================================
// Lifecycle
// =============================================================================

unsafe fn path_from_c(path: *const c_char, what: &str) -> Option<PathBuf> {
    if path.is_null() {
        set_last_error(&format!("{} is null", what));
        return None;
    }
    match CStr::from_ptr(path).to_str() {
        Ok(s) => Some(PathBuf::from(s)),
        Err(_) => {
            set_last_error(&format!("Invalid UTF-8 in {}", what));
            None
        }
    }
}

unsafe fn gl_from_loader(loader: VtxGlLoader, user_data: *mut c_void) -> Option<glow::Context> {
    let loader = match loader {
        Some(l) => l,
        None => {
            set_last_error("GL loader is null");
            return None;
        }
    };
    // The host guarantees `loader` accepts its own user data
    let load = |name: &str| {
        let name = CString::new(name).unwrap_or_default();
        loader(name.as_ptr(), user_data)
    };
    Some(glow::Context::from_loader_function(load))
}

fn create_handle<L>(library: L, gl: glow::Context, path: PathBuf) -> *mut VtxVideoTextureHandle
where
    L: CodecLibrary,
    L::Codec: 'static,
{
    let library = BoxedLibrary(library);
    match VideoTexture::open(&library, gl, &path, &StreamConfig::default()) {
        Ok(texture) => Box::into_raw(Box::new(VtxVideoTextureHandle {
            texture: Mutex::new(texture),
        })),
        Err(e) => {
            log::error!("FFI::create - {}", e);
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Open `path` with the built-in FFmpeg decoder.
/// Returns null on failure; see `vtx_get_last_error`.
///
/// # Safety
/// `path` must be a NUL-terminated string; the GL context `loader` resolves
/// against must be current on the calling thread.
#[cfg(feature = "ffmpeg")]
#[no_mangle]
pub unsafe extern "C" fn vtx_video_texture_create(
    path: *const c_char,
    loader: VtxGlLoader,
    user_data: *mut c_void,
) -> *mut VtxVideoTextureHandle {
    let path = match path_from_c(path, "path") {
        Some(p) => p,
        None => return ptr::null_mut(),
    };
    let gl = match gl_from_loader(loader, user_data) {
        Some(gl) => gl,
        None => return ptr::null_mut(),
    };
    let library = crate::decoder::FfmpegLibrary::new(&StreamConfig::default());
    create_handle(library, gl, path)
}

/// Open `path` with a decoder library exporting the viddecode ABI.
///
/// # Safety
/// As `vtx_video_texture_create`; `library_path` must name a library that
/// really implements the ABI.
#[no_mangle]
pub unsafe extern "C" fn vtx_video_texture_create_with_library(
    library_path: *const c_char,
    path: *const c_char,
    loader: VtxGlLoader,
    user_data: *mut c_void,
) -> *mut VtxVideoTextureHandle {
    let library_path = match path_from_c(library_path, "library path") {
        Some(p) => p,
        None => return ptr::null_mut(),
    };
    let path = match path_from_c(path, "path") {
        Some(p) => p,
        None => return ptr::null_mut(),
    };
    let library = match ViddecodeLibrary::load_from(&library_path) {
        Ok(l) => l,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };
    let gl = match gl_from_loader(loader, user_data) {
        Some(gl) => gl,
        None => return ptr::null_mut(),
    };
    create_handle(library, gl, path)
}

/// Destroy a video texture, deleting the GL texture and releasing the decoder.
///
/// # Safety
/// `handle` must come from a create call and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn vtx_video_texture_destroy(handle: *mut VtxVideoTextureHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// =============================================================================
// Per-tick
// =============================================================================

/// Advance to the next frame. `*out_advanced` is true when the texture now
/// holds a new frame, false when no frame was available this tick.
///
/// # Safety
/// `handle` must be live; `out_advanced` may be null.
#[no_mangle]
pub unsafe extern "C" fn vtx_video_texture_advance(
    handle: *mut VtxVideoTextureHandle,
    out_advanced: *mut bool,
) -> VtxResult {
    if handle.is_null() {
        return VtxResult::ErrorInvalidHandle;
    }
    let handle = &*handle;
    let result = handle.texture.lock().advance();
    match result {
        Ok(advanced) => {
            if !out_advanced.is_null() {
                *out_advanced = advanced;
            }
            VtxResult::Success
        }
        Err(e) => {
            log::error!("FFI::vtx_video_texture_advance - {}", e);
            e.into()
        }
    }
}

/// GL texture name, 0 until the first frame has been uploaded
///
/// # Safety
/// `handle` must be live or null.
#[no_mangle]
pub unsafe extern "C" fn vtx_video_texture_get_texture(
    handle: *const VtxVideoTextureHandle,
) -> u32 {
    if handle.is_null() {
        return 0;
    }
    let handle = &*handle;
    let texture = handle.texture.lock().texture();
    texture.map_or(0, texture_name)
}

/// Stream width in pixels
///
/// # Safety
/// `handle` must be live or null.
#[no_mangle]
pub unsafe extern "C" fn vtx_video_texture_get_width(handle: *const VtxVideoTextureHandle) -> u32 {
    if handle.is_null() {
        return 0;
    }
    let handle = &*handle;
    handle.texture.lock().dimensions().width
}

/// Stream height in pixels
///
/// # Safety
/// `handle` must be live or null.
#[no_mangle]
pub unsafe extern "C" fn vtx_video_texture_get_height(handle: *const VtxVideoTextureHandle) -> u32 {
    if handle.is_null() {
        return 0;
    }
    let handle = &*handle;
    handle.texture.lock().dimensions().height
}

/// Get stream counters
///
/// # Safety
/// `handle` must be live or null; `out_stats` must be writable or null.
#[no_mangle]
pub unsafe extern "C" fn vtx_video_texture_get_stats(
    handle: *const VtxVideoTextureHandle,
    out_stats: *mut VtxStreamStats,
) {
    if handle.is_null() || out_stats.is_null() {
        return;
    }
    let handle = &*handle;
    let texture = handle.texture.lock();
    let stats = texture.statistics();
    *out_stats = VtxStreamStats {
        frames_delivered: stats.frames_delivered,
        empty_pulls: stats.empty_pulls,
        exhausted_ticks: stats.exhausted_ticks,
        frames_uploaded: texture.frames_uploaded(),
    };
}

//! Binding to an externally compiled decoder library exporting the
//! `viddecode` ABI, loaded at runtime via `libloading`.
//!
//! The library owns every buffer behind a handle. Frame pointers returned by
//! `nextFrame` are never dereferenced here; they only signal whether a frame
//! is current for the following `convertToRGB`.

use std::ffi::{c_char, c_int, c_void, CString};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;

use libloading::Library;

use super::{CodecLibrary, NativeCodec};
use crate::error::{Error, Result};

type InitFn = unsafe extern "C" fn(*mut c_void, *mut c_char) -> c_int;
type MallocDecoderDataFn = unsafe extern "C" fn() -> *mut c_void;
type NextFrameFn = unsafe extern "C" fn(*mut c_void) -> *mut *mut u8;
type ReleaseResourcesFn = unsafe extern "C" fn(*mut c_void);
type ConvertToRgbFn = unsafe extern "C" fn(*mut c_void, *mut u8) -> c_int;
type DimensionFn = unsafe extern "C" fn(*mut c_void) -> c_int;

/// Status returned for paths the C side cannot receive
const STATUS_INVALID_ARGUMENT: i32 = -22;

/// Resolved ABI entry points. The function pointers stay valid as long as
/// `_lib` is loaded.
struct ViddecodeApi {
    _lib: Library,
    init: InitFn,
    malloc_decoder_data: MallocDecoderDataFn,
    next_frame: NextFrameFn,
    release_resources: ReleaseResourcesFn,
    convert_to_rgb: ConvertToRgbFn,
    get_width: DimensionFn,
    get_height: DimensionFn,
}

/// A loaded decoder library
#[derive(Clone)]
pub struct ViddecodeLibrary {
    api: Arc<ViddecodeApi>,
}

impl ViddecodeLibrary {
    /// Load the decoder library from its usual locations
    pub fn load() -> Result<Self> {
        let mut last_error = None;
        for path in Self::candidate_paths() {
            // SAFETY: loading a decoder library; its initializers have no
            // preconditions beyond being a valid shared object.
            match unsafe { Library::new(path) } {
                Ok(lib) => {
                    log::info!("Loaded decoder library from {}", path);
                    return Self::load_functions(lib);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(Error::LibraryNotFound(format!(
            "viddecode library not found in {:?}: {}",
            Self::candidate_paths(),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        log::info!("Loading decoder library from {}", path.display());

        // SAFETY: the caller asserts this is a viddecode-compatible library.
        let lib = unsafe { Library::new(path) }.map_err(|e| {
            Error::LibraryNotFound(format!("Failed to load {}: {e}", path.display()))
        })?;

        Self::load_functions(lib)
    }

    fn load_functions(lib: Library) -> Result<Self> {
        // SAFETY: the symbol types match the viddecode C header. Each Symbol
        // is dereferenced to copy the raw function pointer out while `lib`
        // stays owned by the returned value.
        unsafe {
            let init = *lib
                .get::<InitFn>(b"init\0")
                .map_err(|e| Error::SymbolNotFound(format!("init: {e}")))?;
            let malloc_decoder_data = *lib
                .get::<MallocDecoderDataFn>(b"mallocDecoderData\0")
                .map_err(|e| Error::SymbolNotFound(format!("mallocDecoderData: {e}")))?;
            let next_frame = *lib
                .get::<NextFrameFn>(b"nextFrame\0")
                .map_err(|e| Error::SymbolNotFound(format!("nextFrame: {e}")))?;
            let release_resources = *lib
                .get::<ReleaseResourcesFn>(b"releaseResources\0")
                .map_err(|e| Error::SymbolNotFound(format!("releaseResources: {e}")))?;
            let convert_to_rgb = *lib
                .get::<ConvertToRgbFn>(b"convertToRGB\0")
                .map_err(|e| Error::SymbolNotFound(format!("convertToRGB: {e}")))?;
            let get_width = *lib
                .get::<DimensionFn>(b"getWidth\0")
                .map_err(|e| Error::SymbolNotFound(format!("getWidth: {e}")))?;
            let get_height = *lib
                .get::<DimensionFn>(b"getHeight\0")
                .map_err(|e| Error::SymbolNotFound(format!("getHeight: {e}")))?;

            log::debug!("All viddecode symbols loaded");

            Ok(Self {
                api: Arc::new(ViddecodeApi {
                    _lib: lib,
                    init,
                    malloc_decoder_data,
                    next_frame,
                    release_resources,
                    convert_to_rgb,
                    get_width,
                    get_height,
                }),
            })
        }
    }

    fn candidate_paths() -> &'static [&'static str] {
        if cfg!(target_os = "windows") {
            &["viddecode.dll", "viddecoder/viddecode.dll"]
        } else if cfg!(target_os = "macos") {
            &[
                "libviddecode.dylib",
                "viddecoder/viddecode.so",
                "./viddecode.so",
            ]
        } else {
            &[
                "viddecoder/viddecode.so",
                "./viddecode.so",
                "libviddecode.so",
            ]
        }
    }
}

impl CodecLibrary for ViddecodeLibrary {
    type Codec = ViddecodeStream;

    fn alloc(&self) -> Result<ViddecodeStream> {
        // SAFETY: no arguments; returns a fresh handle or null.
        let raw = unsafe { (self.api.malloc_decoder_data)() };
        let handle = NonNull::new(raw).ok_or(Error::Memory)?;
        Ok(ViddecodeStream {
            api: self.api.clone(),
            handle,
            width: 0,
            height: 0,
            has_frame: false,
        })
    }
}

/// One handle allocated by a [`ViddecodeLibrary`].
///
/// The ABI has no call to free the handle block itself, only the resources
/// hanging off it, so that block stays with the library after `release`.
pub struct ViddecodeStream {
    api: Arc<ViddecodeApi>,
    handle: NonNull<c_void>,
    width: i32,
    height: i32,
    has_frame: bool,
}

impl NativeCodec for ViddecodeStream {
    fn init(&mut self, path: &Path) -> i32 {
        let path = match path.to_str().and_then(|s| CString::new(s).ok()) {
            Some(p) => p,
            None => {
                log::warn!("Path not representable for the decoder: {}", path.display());
                return STATUS_INVALID_ARGUMENT;
            }
        };

        // SAFETY: `handle` came from mallocDecoderData; the library reads
        // the NUL-terminated path and does not keep the pointer.
        let status = unsafe { (self.api.init)(self.handle.as_ptr(), path.as_ptr() as *mut c_char) };
        if status == 0 {
            // Cached: valid to query only after a successful init
            // SAFETY: handle initialized above.
            unsafe {
                self.width = (self.api.get_width)(self.handle.as_ptr());
                self.height = (self.api.get_height)(self.handle.as_ptr());
            }
        }
        status
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn next_frame(&mut self) -> bool {
        // SAFETY: initialized handle; the returned plane table is decoder
        // owned and only compared against null.
        let planes = unsafe { (self.api.next_frame)(self.handle.as_ptr()) };
        self.has_frame = !planes.is_null();
        self.has_frame
    }

    fn convert_to_rgb(&mut self, dest: &mut [u8]) -> i32 {
        let expected = self.width as usize * self.height as usize * 3;
        if dest.len() != expected {
            return STATUS_INVALID_ARGUMENT;
        }
        if !self.has_frame {
            return -1;
        }
        // SAFETY: `dest` holds width*height*3 bytes, which is what
        // convertToRGB writes with a stride of width*3.
        unsafe { (self.api.convert_to_rgb)(self.handle.as_ptr(), dest.as_mut_ptr()) }
    }

    fn release(&mut self) {
        self.has_frame = false;
        // SAFETY: DecoderBinding calls this exactly once per handle.
        unsafe { (self.api.release_resources)(self.handle.as_ptr()) }
    }
}

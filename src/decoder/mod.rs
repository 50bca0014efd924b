//! Native decoder surface
//!
//! The decoder is an opaque component reached through a fixed C-style ABI:
//!
//! ```text
//! void*     mallocDecoderData()
//! int       init(void* handle, char* path)            // 0 = success
//! uint8_t** nextFrame(void* handle)                   // NULL => no frame
//! int       convertToRGB(void* handle, uint8_t* dst)  // dst = width*height*3
//! int       getWidth(void* handle)
//! int       getHeight(void* handle)
//! void      releaseResources(void* handle)
//! ```
//!
//! [`CodecLibrary`] and [`NativeCodec`] mirror that surface one call per
//! method. Ownership rules live in [`DecoderBinding`]: the caller never frees
//! decoder-owned frame memory, and every allocated handle is released through
//! exactly one `release` call.

use std::path::Path;

mod binding;
pub(crate) mod config;
#[cfg(feature = "ffmpeg")]
pub(crate) mod ffmpeg_decoder;
mod frame;
pub mod native;

pub use binding::{DecoderBinding, RawFrame};
pub use config::{ScalingAlgorithm, StreamConfig, DEFAULT_MAX_EMPTY_PULLS};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg_decoder::{FfmpegCodec, FfmpegLibrary};
pub use frame::{PixelBuffer, StreamDimensions};
pub use native::{ViddecodeLibrary, ViddecodeStream};

use crate::error::Result;

/// Allocates decoder handles (`mallocDecoderData`)
pub trait CodecLibrary {
    /// Per-stream handle type
    type Codec: NativeCodec;

    /// Allocate an uninitialized decoder handle
    fn alloc(&self) -> Result<Self::Codec>;
}

/// One decoder handle.
///
/// Implementations are driven only through [`DecoderBinding`], which
/// guarantees `init` runs once, nothing is called after `release`, and
/// `release` runs exactly once.
pub trait NativeCodec {
    /// Bind the handle to a media file. Returns the native status, 0 = success.
    fn init(&mut self, path: &Path) -> i32;

    /// Stream width in pixels
    fn width(&self) -> i32;

    /// Stream height in pixels
    fn height(&self) -> i32;

    /// Advance by one frame. `false` means the decoder returned no frame.
    fn next_frame(&mut self) -> bool;

    /// Convert the current frame into `dest` as packed RGB24.
    /// Returns the native status, 0 = success.
    fn convert_to_rgb(&mut self, dest: &mut [u8]) -> i32;

    /// Free every decoder-internal resource
    fn release(&mut self);
}

impl<C: NativeCodec + ?Sized> NativeCodec for Box<C> {
    fn init(&mut self, path: &Path) -> i32 {
        (**self).init(path)
    }

    fn width(&self) -> i32 {
        (**self).width()
    }

    fn height(&self) -> i32 {
        (**self).height()
    }

    fn next_frame(&mut self) -> bool {
        (**self).next_frame()
    }

    fn convert_to_rgb(&mut self, dest: &mut [u8]) -> i32 {
        (**self).convert_to_rgb(dest)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Erases the codec type of a library so different backends share one
/// `VideoTexture` type (used by the C exports).
pub struct BoxedLibrary<L>(pub L);

impl<L> CodecLibrary for BoxedLibrary<L>
where
    L: CodecLibrary,
    L::Codec: 'static,
{
    type Codec = Box<dyn NativeCodec>;

    fn alloc(&self) -> Result<Self::Codec> {
        Ok(Box::new(self.0.alloc()?))
    }
}

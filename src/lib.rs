//! vidtex-core - decoded video frames streamed into GPU textures
//!
//! This crate provides:
//! - A binding to native video decoders with strict handle ownership
//! - A bounded-retry frame pull loop
//! - RGB texture uploads with mip-map regeneration through `glow`
//! - C exports for host engines
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │           FFI Layer                  │
//! │  (C exports via #[no_mangle])        │
//! └─────────────────────────────────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────┐
//! │         VideoTexture                 │
//! │  (advance once per render tick)      │
//! └─────────────────────────────────────┘
//!          │                  │
//!          ▼                  ▼
//! ┌──────────────────┐ ┌────────────────┐
//! │  FrameFetcher    │ │ TextureUploader│
//! │  (bounded retry) │ │ (GL texture)   │
//! └──────────────────┘ └────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────┐
//! │        DecoderBinding                │
//! │  (FFmpeg or viddecode library)       │
//! └─────────────────────────────────────┘
//! ```

pub mod decoder;
pub mod error;
pub mod ffi;
pub mod stream;
pub mod texture;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
#[cfg(feature = "ffmpeg")]
pub use decoder::{FfmpegCodec, FfmpegLibrary};
pub use decoder::{
    CodecLibrary, DecoderBinding, NativeCodec, PixelBuffer, StreamConfig, StreamDimensions,
    ViddecodeLibrary,
};
pub use error::{Error, Result};
pub use stream::{FetchState, StreamStatistics, VideoTexture};
pub use texture::{GraphicsBackend, TextureUploader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library (call once at startup)
pub fn init() {
    // Initialize logging with info level by default if RUST_LOG is not set
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).try_init();

    log::info!("vidtex-core {} initialized", VERSION);
}

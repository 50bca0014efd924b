//! Decode-to-texture streaming
//!
//! [`VideoTexture`] ties one decoder handle to one GPU texture. Call
//! [`VideoTexture::advance`] once per render tick; when it returns `true`
//! the texture holds the next frame.

use std::path::Path;

use crate::decoder::{CodecLibrary, DecoderBinding, NativeCodec, StreamConfig, StreamDimensions};
use crate::error::Result;
use crate::texture::{GraphicsBackend, TextureUploader};

mod fetcher;

pub use fetcher::{Fetch, FetchState, FrameFetcher, StreamStatistics};

/// A video file streamed into a texture, one frame per successful advance.
///
/// Not thread-safe: the decoder handle and the texture are both mutated in
/// place, and GL calls need the owning context current.
pub struct VideoTexture<C: NativeCodec, G: GraphicsBackend> {
    // `None` only after drop has deleted the texture
    uploader: Option<TextureUploader<G::Texture>>,
    binding: DecoderBinding<C>,
    fetcher: FrameFetcher,
    gl: G,
    has_frame: bool,
}

impl<C: NativeCodec, G: GraphicsBackend> VideoTexture<C, G> {
    /// Open `path` with a decoder from `library` and create the texture.
    ///
    /// Fails without leaking if the decoder cannot be opened or the texture
    /// cannot be created.
    pub fn open<L, P>(library: &L, gl: G, path: P, config: &StreamConfig) -> Result<Self>
    where
        L: CodecLibrary<Codec = C>,
        P: AsRef<Path>,
    {
        config.validate()?;

        let binding = DecoderBinding::open(library, path)?;
        // binding drops (and releases) if this fails
        let uploader = TextureUploader::new(&gl)?;

        Ok(Self {
            uploader: Some(uploader),
            binding,
            fetcher: FrameFetcher::new(config.max_empty_pulls),
            gl,
            has_frame: false,
        })
    }

    /// Move to the next frame.
    ///
    /// `Ok(true)` after uploading a new frame; `Ok(false)` when the retry
    /// bound was reached, leaving the previous texture content in place.
    /// Conversion failures are returned as errors.
    pub fn advance(&mut self) -> Result<bool> {
        match self.fetcher.pull(&mut self.binding)? {
            Fetch::Frame(pixels) => {
                if let Some(ref mut uploader) = self.uploader {
                    uploader.upload(&self.gl, &pixels);
                }
                self.has_frame = true;
                Ok(true)
            }
            Fetch::Exhausted => Ok(false),
        }
    }

    /// Texture to sample, once a frame has been uploaded
    pub fn texture(&self) -> Option<G::Texture> {
        if !self.has_frame {
            return None;
        }
        self.uploader.as_ref().map(|u| u.texture())
    }

    pub fn dimensions(&self) -> StreamDimensions {
        self.binding.dimensions()
    }

    pub fn path(&self) -> &Path {
        self.binding.path()
    }

    pub fn fetch_state(&self) -> FetchState {
        self.fetcher.state()
    }

    pub fn statistics(&self) -> StreamStatistics {
        self.fetcher.statistics()
    }

    /// Number of frames uploaded so far
    pub fn frames_uploaded(&self) -> u64 {
        self.uploader.as_ref().map_or(0, |u| u.uploads())
    }
}

impl<C: NativeCodec, G: GraphicsBackend> Drop for VideoTexture<C, G> {
    fn drop(&mut self) {
        if let Some(uploader) = self.uploader.take() {
            uploader.delete(&self.gl);
        }
        self.binding.release();
        log::info!(
            "Closed {} after {} frames",
            self.binding.path().display(),
            self.fetcher.statistics().frames_delivered
        );
    }
}

impl<C: NativeCodec, G: GraphicsBackend> std::fmt::Debug for VideoTexture<C, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoTexture")
            .field("binding", &self.binding)
            .field("fetcher", &self.fetcher)
            .field("texture", &self.uploader.as_ref().map(|u| u.texture()))
            .field("has_frame", &self.has_frame)
            .finish()
    }
}

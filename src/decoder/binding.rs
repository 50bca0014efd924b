//! Owning wrapper around one native decoder handle

use std::path::{Path, PathBuf};

use super::frame::{PixelBuffer, StreamDimensions};
use super::{CodecLibrary, NativeCodec};
use crate::error::{Error, Result};

/// Exclusive owner of one decoder handle.
///
/// The handle is placed under this guard right after allocation, so it is
/// released exactly once whether the binding is released explicitly,
/// dropped, or abandoned halfway through [`DecoderBinding::open`].
pub struct DecoderBinding<C: NativeCodec> {
    codec: C,
    path: PathBuf,
    dimensions: StreamDimensions,
    released: bool,
}

impl<C: NativeCodec> DecoderBinding<C> {
    /// Allocate a handle and bind it to `path`
    pub fn open<L, P>(library: &L, path: P) -> Result<Self>
    where
        L: CodecLibrary<Codec = C>,
        P: AsRef<Path>,
    {
        let path = path.as_ref();

        // Checked before allocating so a bad path leaves nothing behind
        if path.to_str().is_none() {
            return Err(Error::InvalidPath(path.to_path_buf()));
        }
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let mut binding = Self {
            codec: library.alloc()?,
            path: path.to_path_buf(),
            dimensions: StreamDimensions {
                width: 0,
                height: 0,
            },
            released: false,
        };

        let status = binding.codec.init(path);
        if status != 0 {
            log::warn!(
                "Decoder init failed for {}: {}",
                path.display(),
                Error::from_status(status)
            );
            return Err(Error::Open {
                path: path.to_path_buf(),
                status,
            });
        }

        binding.dimensions =
            StreamDimensions::from_native(binding.codec.width(), binding.codec.height())?;

        log::info!(
            "Opened {} ({}x{})",
            path.display(),
            binding.dimensions.width,
            binding.dimensions.height
        );
        Ok(binding)
    }

    /// Stream size, constant for the binding's lifetime
    pub fn dimensions(&self) -> StreamDimensions {
        self.dimensions
    }

    /// Path the decoder was opened with
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Advance the stream by one frame.
    ///
    /// The returned frame borrows the binding, so it cannot outlive the next
    /// pull or the release.
    pub fn pull_frame(&mut self) -> Option<RawFrame<'_, C>> {
        if self.released {
            log::warn!("pull_frame on released decoder for {}", self.path.display());
            return None;
        }
        if self.codec.next_frame() {
            Some(RawFrame { binding: self })
        } else {
            None
        }
    }

    /// Release the native handle. Later calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.codec.release();
        log::debug!("Released decoder for {}", self.path.display());
    }
}

impl<C: NativeCodec> Drop for DecoderBinding<C> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: NativeCodec> std::fmt::Debug for DecoderBinding<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderBinding")
            .field("path", &self.path)
            .field("dimensions", &self.dimensions)
            .field("released", &self.released)
            .finish()
    }
}

/// The decoder's current frame, valid until the next pull
pub struct RawFrame<'a, C: NativeCodec> {
    binding: &'a mut DecoderBinding<C>,
}

impl<'a, C: NativeCodec> RawFrame<'a, C> {
    pub fn dimensions(&self) -> StreamDimensions {
        self.binding.dimensions
    }

    /// Convert into a freshly allocated RGB24 buffer
    pub fn to_rgb(self) -> Result<PixelBuffer> {
        let mut buffer = PixelBuffer::zeroed(self.binding.dimensions);
        let status = self.binding.codec.convert_to_rgb(buffer.as_mut_slice());
        if status != 0 {
            log::error!(
                "RGB conversion failed for {}: {}",
                self.binding.path.display(),
                Error::from_status(status)
            );
            return Err(Error::Conversion { status });
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Pull, ScriptedLibrary};

    #[test]
    fn test_open_missing_file_allocates_nothing() {
        let library = ScriptedLibrary::new(4, 2, vec![]);
        let result = DecoderBinding::open(&library, "/nonexistent/clip.mp4");
        assert!(matches!(result, Err(Error::FileNotFound(_))));
        assert_eq!(library.counters().allocs, 0);
        assert_eq!(library.counters().releases, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_open_non_utf8_path_allocates_nothing() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let library = ScriptedLibrary::new(4, 2, vec![]);
        let path = Path::new(OsStr::from_bytes(b"/tmp/clip\xff.mp4"));
        let result = DecoderBinding::open(&library, path);

        match result {
            Err(err @ Error::InvalidPath(_)) => assert!(err.is_open_error()),
            other => panic!("expected invalid path, got {:?}", other),
        }
        assert_eq!(library.counters().allocs, 0);
    }

    #[test]
    fn test_failed_init_releases_handle() {
        let library = ScriptedLibrary::new(4, 2, vec![]).with_init_status(-1094995529);
        let file = tempfile::NamedTempFile::new().unwrap();

        let result = DecoderBinding::open(&library, file.path());
        match result {
            Err(err @ Error::Open { status, .. }) => {
                assert_eq!(status, -1094995529);
                assert!(err.is_open_error());
            }
            other => panic!("expected open error, got {:?}", other),
        }
        assert_eq!(library.counters().allocs, 1);
        assert_eq!(library.counters().inits, 1);
        assert_eq!(library.counters().releases, 1);
    }

    #[test]
    fn test_invalid_dimensions_release_handle() {
        let library = ScriptedLibrary::new(0, 2, vec![]);
        let file = tempfile::NamedTempFile::new().unwrap();

        let result = DecoderBinding::open(&library, file.path());
        assert!(matches!(result, Err(Error::InvalidDimensions { .. })));
        assert_eq!(library.counters().releases, 1);
    }

    #[test]
    fn test_dimensions_constant() {
        let library = ScriptedLibrary::with_frames(4, 2, 3);
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut binding = DecoderBinding::open(&library, file.path()).unwrap();

        let expected = StreamDimensions {
            width: 4,
            height: 2,
        };
        assert_eq!(binding.dimensions(), expected);
        while let Some(frame) = binding.pull_frame() {
            assert_eq!(frame.dimensions(), expected);
            let _ = frame.to_rgb().unwrap();
        }
        assert_eq!(binding.dimensions(), expected);
    }

    #[test]
    fn test_pixel_buffer_matches_dimensions() {
        let library = ScriptedLibrary::with_frames(5, 3, 2);
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut binding = DecoderBinding::open(&library, file.path()).unwrap();

        let mut produced = 0;
        while let Some(frame) = binding.pull_frame() {
            let pixels = frame.to_rgb().unwrap();
            assert_eq!(pixels.len(), 5 * 3 * 3);
            produced += 1;
        }
        assert_eq!(produced, 2);
    }

    #[test]
    fn test_conversion_failure() {
        let library =
            ScriptedLibrary::new(4, 2, vec![Pull::frame(4, 2, 1)]).with_convert_status(-1);
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut binding = DecoderBinding::open(&library, file.path()).unwrap();

        let frame = binding.pull_frame().unwrap();
        assert!(matches!(frame.to_rgb(), Err(Error::Conversion { status: -1 })));
        assert_eq!(library.counters().converts, 1);
    }

    #[test]
    fn test_release_exactly_once() {
        let library = ScriptedLibrary::with_frames(4, 2, 1);
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut binding = DecoderBinding::open(&library, file.path()).unwrap();

        binding.release();
        binding.release();
        assert!(binding.is_released());
        assert!(binding.pull_frame().is_none());
        drop(binding);

        assert_eq!(library.counters().releases, 1);
        // nothing reached the codec after release
        assert_eq!(library.counters().pulls, 0);
    }

    #[test]
    fn test_drop_releases() {
        let library = ScriptedLibrary::with_frames(4, 2, 1);
        let file = tempfile::NamedTempFile::new().unwrap();
        {
            let _binding = DecoderBinding::open(&library, file.path()).unwrap();
        }
        assert_eq!(library.counters().releases, 1);
    }
}

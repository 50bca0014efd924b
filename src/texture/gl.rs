//! OpenGL backend through `glow`
//!
//! All calls assume the context is current on the calling thread.

use glow::HasContext;

use super::GraphicsBackend;
use crate::error::{Error, Result};

impl GraphicsBackend for glow::Context {
    type Texture = glow::NativeTexture;

    fn create_texture(&self) -> Result<Self::Texture> {
        // SAFETY: plain object creation on the current context.
        unsafe { HasContext::create_texture(self) }
            .map_err(|e| Error::Graphics(format!("create_texture failed: {e}")))
    }

    fn delete_texture(&self, texture: Self::Texture) {
        // SAFETY: the texture was created on this context and is deleted once.
        unsafe { HasContext::delete_texture(self, texture) }
    }

    fn bind_texture(&self, texture: Option<Self::Texture>) {
        // SAFETY: binding a live texture name (or unbinding) has no
        // memory-safety preconditions.
        unsafe { HasContext::bind_texture(self, glow::TEXTURE_2D, texture) }
    }

    fn tex_parameter_i32(&self, parameter: u32, value: i32) {
        // SAFETY: scalar state change on the bound texture.
        unsafe { HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, parameter, value) }
    }

    fn pixel_store_i32(&self, parameter: u32, value: i32) {
        // SAFETY: scalar state change.
        unsafe { HasContext::pixel_store_i32(self, parameter, value) }
    }

    fn tex_image_2d_rgb(&self, width: i32, height: i32, pixels: &[u8]) {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 3);
        // SAFETY: `pixels` holds width*height packed RGB8 texels and unpack
        // alignment is 1, so GL reads exactly `pixels.len()` bytes.
        unsafe {
            HasContext::tex_image_2d(
                self,
                glow::TEXTURE_2D,
                0,
                glow::RGB as i32,
                width,
                height,
                0,
                glow::RGB,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            )
        }
    }

    fn generate_mipmap(&self) {
        // SAFETY: operates on the bound texture, which has a level-0 image.
        unsafe { HasContext::generate_mipmap(self, glow::TEXTURE_2D) }
    }
}

/// GL texture name as seen by C callers (0 for none)
pub fn texture_name(texture: glow::NativeTexture) -> u32 {
    texture.0.get()
}

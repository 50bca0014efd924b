//! GPU texture ownership and per-frame uploads
//!
//! [`GraphicsBackend`] is the slice of OpenGL the pipeline touches. It is
//! implemented for `glow::Context` in [`gl`], and for test doubles.

use std::rc::Rc;
use std::sync::Arc;

use crate::decoder::PixelBuffer;
use crate::error::Result;

pub mod gl;

/// Graphics calls used by [`TextureUploader`]. Every call targets
/// `TEXTURE_2D`; parameter names and values are GL enums from `glow`.
pub trait GraphicsBackend {
    /// Texture object name
    type Texture: Copy + std::fmt::Debug;

    fn create_texture(&self) -> Result<Self::Texture>;

    fn delete_texture(&self, texture: Self::Texture);

    fn bind_texture(&self, texture: Option<Self::Texture>);

    fn tex_parameter_i32(&self, parameter: u32, value: i32);

    fn pixel_store_i32(&self, parameter: u32, value: i32);

    /// Full level-0 RGB8 image from packed unsigned-byte pixels
    fn tex_image_2d_rgb(&self, width: i32, height: i32, pixels: &[u8]);

    fn generate_mipmap(&self);
}

macro_rules! forward_backend {
    ($($ptr:ty),*) => {$(
        impl<T: GraphicsBackend + ?Sized> GraphicsBackend for $ptr {
            type Texture = T::Texture;

            fn create_texture(&self) -> Result<Self::Texture> {
                (**self).create_texture()
            }

            fn delete_texture(&self, texture: Self::Texture) {
                (**self).delete_texture(texture)
            }

            fn bind_texture(&self, texture: Option<Self::Texture>) {
                (**self).bind_texture(texture)
            }

            fn tex_parameter_i32(&self, parameter: u32, value: i32) {
                (**self).tex_parameter_i32(parameter, value)
            }

            fn pixel_store_i32(&self, parameter: u32, value: i32) {
                (**self).pixel_store_i32(parameter, value)
            }

            fn tex_image_2d_rgb(&self, width: i32, height: i32, pixels: &[u8]) {
                (**self).tex_image_2d_rgb(width, height, pixels)
            }

            fn generate_mipmap(&self) {
                (**self).generate_mipmap()
            }
        }
    )*};
}

forward_backend!(&T, Rc<T>, Arc<T>);

/// Owns one 2D texture and streams frames into it
#[derive(Debug)]
pub struct TextureUploader<T> {
    texture: T,
    uploads: u64,
}

impl<T: Copy + std::fmt::Debug> TextureUploader<T> {
    /// Create and configure the texture
    pub fn new<G>(gl: &G) -> Result<Self>
    where
        G: GraphicsBackend<Texture = T> + ?Sized,
    {
        let texture = gl.create_texture()?;
        let uploader = Self {
            texture,
            uploads: 0,
        };
        uploader.configure(gl);
        log::debug!("Created video texture {:?}", texture);
        Ok(uploader)
    }

    /// Sampling state: repeat on both axes, linear magnification,
    /// trilinear minification. Set once; it is per-texture GL state.
    pub fn configure<G>(&self, gl: &G)
    where
        G: GraphicsBackend<Texture = T> + ?Sized,
    {
        gl.bind_texture(Some(self.texture));
        gl.tex_parameter_i32(glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
        gl.tex_parameter_i32(glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
        gl.tex_parameter_i32(glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(
            glow::TEXTURE_MIN_FILTER,
            glow::LINEAR_MIPMAP_LINEAR as i32,
        );
        gl.bind_texture(None);
    }

    /// Replace the texture image with `pixels` and rebuild its mip chain
    pub fn upload<G>(&mut self, gl: &G, pixels: &PixelBuffer)
    where
        G: GraphicsBackend<Texture = T> + ?Sized,
    {
        let dims = pixels.dimensions();

        // RGB rows are not 4-byte aligned in general
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.bind_texture(Some(self.texture));
        gl.tex_image_2d_rgb(dims.width as i32, dims.height as i32, pixels.as_slice());
        gl.generate_mipmap();

        self.uploads += 1;
        log::trace!("Uploaded frame {} to {:?}", self.uploads, self.texture);
    }

    /// Delete the texture object
    pub fn delete<G>(self, gl: &G)
    where
        G: GraphicsBackend<Texture = T> + ?Sized,
    {
        gl.delete_texture(self.texture);
        log::debug!("Deleted video texture {:?}", self.texture);
    }

    pub fn texture(&self) -> T {
        self.texture
    }

    /// Number of frames uploaded so far
    pub fn uploads(&self) -> u64 {
        self.uploads
    }
}

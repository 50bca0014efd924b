//! In-memory codec and graphics backends for unit tests

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use crate::decoder::{CodecLibrary, NativeCodec};
use crate::error::{Error, Result};
use crate::texture::GraphicsBackend;

/// One scripted answer to `next_frame`
#[derive(Debug, Clone)]
pub enum Pull {
    Frame(Vec<u8>),
    Empty,
}

impl Pull {
    /// Frame with a recognisable byte pattern
    pub fn frame(width: usize, height: usize, seed: u8) -> Self {
        let len = width * height * 3;
        Pull::Frame(
            (0..len)
                .map(|i| seed.wrapping_mul(31).wrapping_add(i as u8))
                .collect(),
        )
    }

    pub fn empties(count: usize) -> Vec<Pull> {
        vec![Pull::Empty; count]
    }
}

/// Native call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub allocs: u32,
    pub inits: u32,
    pub pulls: u32,
    pub converts: u32,
    pub releases: u32,
}

struct Script {
    width: i32,
    height: i32,
    init_status: i32,
    convert_status: i32,
    pulls: VecDeque<Pull>,
    counters: Counters,
}

/// Codec library replaying a fixed pull script. Once the script runs out
/// every pull is empty.
#[derive(Clone)]
pub struct ScriptedLibrary {
    script: Rc<RefCell<Script>>,
}

impl ScriptedLibrary {
    pub fn new(width: i32, height: i32, pulls: Vec<Pull>) -> Self {
        Self {
            script: Rc::new(RefCell::new(Script {
                width,
                height,
                init_status: 0,
                convert_status: 0,
                pulls: pulls.into(),
                counters: Counters::default(),
            })),
        }
    }

    /// `count` frames followed by end-of-stream
    pub fn with_frames(width: i32, height: i32, count: u8) -> Self {
        let pulls = (0..count)
            .map(|seed| Pull::frame(width as usize, height as usize, seed))
            .collect();
        Self::new(width, height, pulls)
    }

    pub fn with_init_status(self, status: i32) -> Self {
        self.script.borrow_mut().init_status = status;
        self
    }

    pub fn with_convert_status(self, status: i32) -> Self {
        self.script.borrow_mut().convert_status = status;
        self
    }

    pub fn counters(&self) -> Counters {
        self.script.borrow().counters
    }
}

impl CodecLibrary for ScriptedLibrary {
    type Codec = ScriptedCodec;

    fn alloc(&self) -> Result<ScriptedCodec> {
        self.script.borrow_mut().counters.allocs += 1;
        Ok(ScriptedCodec {
            script: self.script.clone(),
            current: None,
        })
    }
}

pub struct ScriptedCodec {
    script: Rc<RefCell<Script>>,
    current: Option<Vec<u8>>,
}

impl NativeCodec for ScriptedCodec {
    fn init(&mut self, _path: &Path) -> i32 {
        let mut script = self.script.borrow_mut();
        script.counters.inits += 1;
        script.init_status
    }

    fn width(&self) -> i32 {
        self.script.borrow().width
    }

    fn height(&self) -> i32 {
        self.script.borrow().height
    }

    fn next_frame(&mut self) -> bool {
        let mut script = self.script.borrow_mut();
        script.counters.pulls += 1;
        match script.pulls.pop_front() {
            Some(Pull::Frame(data)) => {
                self.current = Some(data);
                true
            }
            Some(Pull::Empty) | None => {
                self.current = None;
                false
            }
        }
    }

    fn convert_to_rgb(&mut self, dest: &mut [u8]) -> i32 {
        let mut script = self.script.borrow_mut();
        script.counters.converts += 1;
        if script.convert_status != 0 {
            return script.convert_status;
        }
        match self.current {
            Some(ref data) if data.len() == dest.len() => {
                dest.copy_from_slice(data);
                0
            }
            Some(_) => -22,
            None => -1,
        }
    }

    fn release(&mut self) {
        self.script.borrow_mut().counters.releases += 1;
        self.current = None;
    }
}

/// A call made against [`RecordingGl`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlCall {
    CreateTexture(u32),
    DeleteTexture(u32),
    BindTexture(Option<u32>),
    TexParameter(u32, i32),
    PixelStore(u32, i32),
    TexImage2dRgb {
        width: i32,
        height: i32,
        pixels: Vec<u8>,
    },
    GenerateMipmap,
}

/// Graphics backend that records every call
#[derive(Default)]
pub struct RecordingGl {
    calls: RefCell<Vec<GlCall>>,
    next_texture: Cell<u32>,
    fail_create: bool,
}

impl RecordingGl {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn failing() -> Rc<Self> {
        Rc::new(Self {
            fail_create: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn count(&self, matches: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| matches(c)).count()
    }

    /// Pixels of the most recent image upload
    pub fn last_upload(&self) -> Option<Vec<u8>> {
        self.calls.borrow().iter().rev().find_map(|c| match c {
            GlCall::TexImage2dRgb { pixels, .. } => Some(pixels.clone()),
            _ => None,
        })
    }

    fn record(&self, call: GlCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl GraphicsBackend for RecordingGl {
    type Texture = u32;

    fn create_texture(&self) -> Result<u32> {
        if self.fail_create {
            return Err(Error::Graphics("out of texture names".to_string()));
        }
        let id = self.next_texture.get() + 1;
        self.next_texture.set(id);
        self.record(GlCall::CreateTexture(id));
        Ok(id)
    }

    fn delete_texture(&self, texture: u32) {
        self.record(GlCall::DeleteTexture(texture));
    }

    fn bind_texture(&self, texture: Option<u32>) {
        self.record(GlCall::BindTexture(texture));
    }

    fn tex_parameter_i32(&self, parameter: u32, value: i32) {
        self.record(GlCall::TexParameter(parameter, value));
    }

    fn pixel_store_i32(&self, parameter: u32, value: i32) {
        self.record(GlCall::PixelStore(parameter, value));
    }

    fn tex_image_2d_rgb(&self, width: i32, height: i32, pixels: &[u8]) {
        self.record(GlCall::TexImage2dRgb {
            width,
            height,
            pixels: pixels.to_vec(),
        });
    }

    fn generate_mipmap(&self) {
        self.record(GlCall::GenerateMipmap);
    }
}

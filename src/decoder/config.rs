//! Stream configuration

use crate::error::{Error, Result};

/// Consecutive empty pulls tolerated before a tick reports end-of-stream
pub const DEFAULT_MAX_EMPTY_PULLS: u32 = 10;

/// Resampling used when converting decoded frames to RGB24
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ScalingAlgorithm {
    /// Nearest neighbour; same size in and out, so this is a format swap
    #[default]
    Point = 0,
    /// Bilinear
    Bilinear = 1,
    /// Bicubic
    Bicubic = 2,
}

/// Stream configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Bounded retry limit for empty pulls within one advance
    pub max_empty_pulls: u32,

    /// Number of decoding threads (0 = auto)
    pub thread_count: u32,

    /// Conversion filter for the FFmpeg backend
    pub scaling: ScalingAlgorithm,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_empty_pulls: DEFAULT_MAX_EMPTY_PULLS,
            thread_count: 0,
            scaling: ScalingAlgorithm::Point,
        }
    }
}

impl StreamConfig {
    pub fn with_max_empty_pulls(mut self, max_empty_pulls: u32) -> Self {
        self.max_empty_pulls = max_empty_pulls;
        self
    }

    pub fn with_thread_count(mut self, thread_count: u32) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingAlgorithm) -> Self {
        self.scaling = scaling;
        self
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_empty_pulls == 0 {
            return Err(Error::InvalidConfig(
                "max_empty_pulls must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! Bounded-retry frame pull loop
//!
//! A single empty pull does not reliably tell a decoder stall apart from the
//! end of the stream, so one `pull` keeps asking up to a fixed number of
//! times before reporting that nothing is available this tick.

use crate::decoder::{DecoderBinding, NativeCodec, PixelBuffer};
use crate::error::Result;

/// Pull-loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Last pull produced a frame (or nothing pulled yet)
    Ready,
    /// Seen at least one empty pull in the current cycle
    Retrying,
    /// Retry bound reached in the last cycle
    Exhausted,
}

/// Outcome of one pull cycle
#[derive(Debug)]
pub enum Fetch {
    /// A converted frame
    Frame(PixelBuffer),
    /// No frame within the retry bound
    Exhausted,
}

/// Pull counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStatistics {
    /// Frames pulled and converted
    pub frames_delivered: u64,
    /// Pulls that returned no frame
    pub empty_pulls: u64,
    /// Cycles that ended in `Exhausted`
    pub exhausted_ticks: u64,
}

/// Drives the decoder one frame per cycle
#[derive(Debug)]
pub struct FrameFetcher {
    state: FetchState,
    retry_counter: u32,
    retry_limit: u32,
    stats: StreamStatistics,
}

impl FrameFetcher {
    /// `retry_limit` is clamped to at least one pull per cycle
    pub fn new(retry_limit: u32) -> Self {
        Self {
            state: FetchState::Ready,
            retry_counter: 0,
            retry_limit: retry_limit.max(1),
            stats: StreamStatistics::default(),
        }
    }

    /// Pull until a frame arrives or `retry_limit` consecutive pulls come
    /// back empty.
    ///
    /// Exhaustion does not stick: the next call starts a fresh cycle, so a
    /// caller that keeps pulling past end-of-stream pays up to
    /// `retry_limit` native pulls each time.
    pub fn pull<C: NativeCodec>(&mut self, binding: &mut DecoderBinding<C>) -> Result<Fetch> {
        if self.state == FetchState::Exhausted {
            log::debug!(
                "Pulling past exhaustion of {}, up to {} more pulls",
                binding.path().display(),
                self.retry_limit
            );
            self.state = FetchState::Ready;
            self.retry_counter = 0;
        }

        loop {
            match binding.pull_frame() {
                Some(frame) => {
                    if self.state == FetchState::Retrying {
                        log::debug!("Frame after {} empty pulls", self.retry_counter);
                    }
                    // A frame ends the stall even if its conversion fails
                    self.state = FetchState::Ready;
                    self.retry_counter = 0;
                    let pixels = frame.to_rgb()?;
                    self.stats.frames_delivered += 1;
                    return Ok(Fetch::Frame(pixels));
                }
                None => {
                    self.retry_counter += 1;
                    self.stats.empty_pulls += 1;
                    log::trace!(
                        "Empty pull {}/{}",
                        self.retry_counter,
                        self.retry_limit
                    );

                    if self.retry_counter >= self.retry_limit {
                        self.state = FetchState::Exhausted;
                        self.stats.exhausted_ticks += 1;
                        if self.stats.exhausted_ticks == 1 {
                            log::info!(
                                "End of stream for {} after {} frames",
                                binding.path().display(),
                                self.stats.frames_delivered
                            );
                        }
                        return Ok(Fetch::Exhausted);
                    }
                    self.state = FetchState::Retrying;
                }
            }
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Consecutive empty pulls in the current cycle
    pub fn retry_counter(&self) -> u32 {
        self.retry_counter
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn statistics(&self) -> StreamStatistics {
        self.stats
    }
}

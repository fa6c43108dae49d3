//! Microsecond timebase, deadlines and the ADB electrical timing constants.

use embassy_time::{Duration, Instant};

/// Length of the attention signal's low phase.
pub const ATTENTION_LOW_US: u32 = 800;
/// Sync period after the attention signal.
pub const ATTENTION_HIGH_US: u32 = 150;
/// Total length of one bit cell.
pub const BIT_CELL_US: u32 = 100;
/// Low phase of a `1` bit (and high phase of a `0` bit).
pub const BIT_LONG_US: u32 = 65;
/// Low phase of a `0` bit (and high phase of a `1` bit).
pub const BIT_SHORT_US: u32 = 35;
/// Low phase of the stop bit.
pub const STOP_BIT_LOW_US: u32 = 65;
/// Gap between the command stop bit and the start of a LISTEN payload.
pub const STOP_TO_START_US: u32 = 200;
/// Timeout applied at every edge or level wait.
pub const TIMEOUT_US: u32 = 500;
/// A measured high phase shorter than this decodes as `1`.
pub const BIT_THRESHOLD_US: u32 = 50;
/// Settle time after the line is reset in [`crate::AdbHost::init`].
pub const INIT_SETTLE_US: u32 = 1000;

/// A free-running microsecond counter and a blocking delay.
///
/// `now_us` wraps at 2^32 µs; consumers must compare timestamps with
/// wrapping subtraction only.
pub trait Timebase {
    /// Current value of the monotonic microsecond counter.
    fn now_us(&mut self) -> u32;

    /// Blocks for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Blocks for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1000);
        }
    }
}

/// A [`Timebase`] on top of the `embassy-time` driver.
///
/// The time driver must tick at 1 MHz or faster for bit decoding to be
/// meaningful.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyTimebase;

impl Timebase for EmbassyTimebase {
    #[inline]
    fn now_us(&mut self) -> u32 {
        Instant::now().as_micros() as u32
    }

    #[inline]
    fn delay_us(&mut self, us: u32) {
        embassy_time::block_for(Duration::from_micros(us as u64));
    }
}

/// A timeout measured from a fixed start point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start: u32,
    timeout_us: u32,
}

impl Deadline {
    /// A deadline `timeout_us` after `start`.
    pub const fn after(start: u32, timeout_us: u32) -> Self {
        Self { start, timeout_us }
    }

    /// Microseconds elapsed since the start, wraparound-safe.
    pub const fn elapsed(&self, now: u32) -> u32 {
        now.wrapping_sub(self.start)
    }

    /// True once strictly more than the timeout has elapsed.
    pub const fn is_expired(&self, now: u32) -> bool {
        self.elapsed(now) > self.timeout_us
    }
}

/// Decodes one received bit from the length of its high phase.
pub const fn decode_bit(high_us: u32) -> bool {
    high_us < BIT_THRESHOLD_US
}

/// Low and high phase lengths used to transmit `bit`.
pub const fn encode_bit(bit: bool) -> (u32, u32) {
    if bit {
        (BIT_LONG_US, BIT_SHORT_US)
    } else {
        (BIT_SHORT_US, BIT_LONG_US)
    }
}

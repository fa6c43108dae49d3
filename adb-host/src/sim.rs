//! A simulated ADB bus for exercising drivers off-target.
//!
//! [`SimBus`] holds a virtual microsecond clock, the host's drive state and one
//! scripted device. [`SimLine`] and [`SimClock`] borrow the same bus through a
//! `RefCell`, so an [`crate::AdbHost`] built from them sees a consistent wire:
//! every read of the clock advances it by 1 µs, every delay by its argument.
//!
//! The device decodes what the host puts on the wire (attention, request byte,
//! LISTEN payload) and, when addressed with a TALK, plays back the next queued
//! [`Reply`] using the same pulse encoding the host decodes.

use core::cell::RefCell;
use core::convert::Infallible;

use heapless::{Deque, Vec};

use crate::cmd::address;
use crate::line::AdbLine;
use crate::timing::{
    encode_bit, Timebase, BIT_LONG_US, BIT_SHORT_US, BIT_THRESHOLD_US, STOP_BIT_LOW_US,
};

/// Delay between the host releasing its stop bit and the device's first low.
pub const RESPONSE_DELAY_US: u32 = 160;
/// High gap after a reply byte's stop bit.
pub const BYTE_GAP_US: u32 = 35;

/// Any host low pulse at least this long is taken as attention.
const ATTENTION_MIN_US: u32 = 600;
const LOG_LEN: usize = 16;
const QUEUE_LEN: usize = 8;

const STOP: [(bool, u32); 2] = [(false, STOP_BIT_LOW_US), (true, BYTE_GAP_US)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Idle,
    StuckLow,
    NoStopBit,
    Truncated(u32),
}

/// A scripted device reply to one TALK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    bytes: Vec<u8, 8>,
    ending: Ending,
}

impl Reply {
    /// The device never pulls the line low.
    pub fn silent() -> Self {
        Self {
            bytes: Vec::new(),
            ending: Ending::Idle,
        }
    }

    /// The device pulls the line low and never lets go.
    pub fn stuck_low() -> Self {
        Self {
            bytes: Vec::new(),
            ending: Ending::StuckLow,
        }
    }

    /// A well-formed reply. Bytes past the eighth are dropped.
    pub fn bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.iter().copied().take(8).collect(),
            ending: Ending::Idle,
        }
    }

    /// The last byte's stop bit never ends.
    pub fn without_stop_bit(mut self) -> Self {
        self.ending = Ending::NoStopBit;
        self
    }

    /// After the bytes, start another one and go idle after `bits` bits.
    pub fn truncated_after(mut self, bits: u32) -> Self {
        self.ending = Ending::Truncated(bits.min(8));
        self
    }

    fn segments(&self) -> impl Iterator<Item = (bool, u32)> + '_ {
        let last = self.bytes.len().saturating_sub(1);
        let frames = self.bytes.iter().enumerate().flat_map(move |(i, &byte)| {
            let bits = (0..8).rev().flat_map(move |n| {
                let (low, high) = encode_bit(byte & (1 << n) != 0);
                [(false, low), (true, high)]
            });
            let stop: &[(bool, u32)] = if i == last && self.ending == Ending::NoStopBit {
                &[]
            } else {
                &STOP
            };
            bits.chain(stop.iter().copied())
        });

        let partial_bits = match self.ending {
            Ending::Truncated(bits) => bits,
            _ => 0,
        };
        let partial = (0..(2 * partial_bits).saturating_sub(1)).map(|i| {
            if i % 2 == 0 {
                (false, BIT_LONG_US)
            } else {
                (true, BIT_SHORT_US)
            }
        });

        frames.chain(partial)
    }

    fn tail(&self) -> bool {
        !matches!(self.ending, Ending::StuckLow | Ending::NoStopBit)
    }

    fn level_at(&self, mut offset: u32) -> bool {
        for (level, duration) in self.segments() {
            if offset < duration {
                return level;
            }
            offset -= duration;
        }
        self.tail()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Command { bits: u8, value: u8 },
    CommandStop { request: u8 },
    Payload { started: bool, bits: u8, value: u8 },
}

/// Shared state of the simulated wire, clock and device.
pub struct SimBus {
    now: u32,
    host_low: bool,
    low_since: u32,
    last_release: u32,
    phase: Phase,
    device_address: u8,
    replies: Deque<Reply, QUEUE_LEN>,
    active: Option<(u32, Reply)>,
    commands: Vec<u8, LOG_LEN>,
    payload: Vec<u8, LOG_LEN>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    /// An idle bus with a keyboard at its default address.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Like [`SimBus::new`] with the clock starting at `now`.
    pub fn starting_at(now: u32) -> Self {
        Self {
            now,
            host_low: false,
            low_since: now,
            last_release: now,
            phase: Phase::Idle,
            device_address: address::KEYBOARD,
            replies: Deque::new(),
            active: None,
            commands: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Moves the simulated device to another address.
    pub fn with_device_address(mut self, address: u8) -> Self {
        self.device_address = address;
        self
    }

    /// Queues the device's reply to a future TALK.
    ///
    /// When the queue is empty the device stays silent. Returns the reply back
    /// if the queue is full.
    pub fn push_reply(&mut self, reply: Reply) -> Result<(), Reply> {
        self.replies.push_back(reply)
    }

    /// Current simulated time.
    pub fn now(&self) -> u32 {
        self.now
    }

    /// Time at which the host last released the line.
    pub fn last_release(&self) -> u32 {
        self.last_release
    }

    /// Whether the host is currently pulling the line low.
    pub fn host_driving(&self) -> bool {
        self.host_low
    }

    /// Request bytes decoded from the wire, most recent last.
    pub fn commands(&self) -> &[u8] {
        &self.commands
    }

    /// LISTEN payload bytes decoded from the wire, most recent last.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Level seen on the wire.
    pub fn level(&self) -> bool {
        !self.host_low && self.device_level()
    }

    fn device_level(&self) -> bool {
        match &self.active {
            Some((start, reply)) => {
                let offset = self.now.wrapping_sub(*start);
                // A start in the future shows up as a huge wrapped offset.
                if offset > u32::MAX / 2 {
                    true
                } else {
                    reply.level_at(offset)
                }
            }
            None => true,
        }
    }

    /// Moves the clock forward, e.g. to let time pass between scans.
    pub fn advance(&mut self, us: u32) {
        self.now = self.now.wrapping_add(us);
    }

    fn drive_low(&mut self) {
        if !self.host_low {
            self.host_low = true;
            self.low_since = self.now;
        }
    }

    fn release(&mut self) {
        if !self.host_low {
            return;
        }
        self.host_low = false;
        self.last_release = self.now;
        let low_us = self.now.wrapping_sub(self.low_since);
        self.decode_pulse(low_us);
    }

    fn decode_pulse(&mut self, low_us: u32) {
        if low_us >= ATTENTION_MIN_US {
            self.active = None;
            self.phase = Phase::Command { bits: 0, value: 0 };
            return;
        }
        let bit = low_us >= BIT_THRESHOLD_US;

        self.phase = match self.phase {
            Phase::Idle => Phase::Idle,
            Phase::Command { bits, value } => {
                let value = (value << 1) | bit as u8;
                if bits + 1 == 8 {
                    log_push(&mut self.commands, value);
                    Phase::CommandStop { request: value }
                } else {
                    Phase::Command {
                        bits: bits + 1,
                        value,
                    }
                }
            }
            Phase::CommandStop { request } => self.command_done(request),
            Phase::Payload { started: false, .. } => Phase::Payload {
                started: true,
                bits: 0,
                value: 0,
            },
            // A trailing stop bit leaves a single bit behind and is never pushed.
            Phase::Payload { bits, value, .. } => {
                let value = (value << 1) | bit as u8;
                if bits + 1 == 8 {
                    log_push(&mut self.payload, value);
                    Phase::Payload {
                        started: true,
                        bits: 0,
                        value: 0,
                    }
                } else {
                    Phase::Payload {
                        started: true,
                        bits: bits + 1,
                        value,
                    }
                }
            }
        };
    }

    fn command_done(&mut self, request: u8) -> Phase {
        if request >> 4 != self.device_address {
            return Phase::Idle;
        }
        match request & 0x0F {
            0x3 | 0xC..=0xF => {
                if let Some(reply) = self.replies.pop_front() {
                    let start = self.now.wrapping_add(RESPONSE_DELAY_US);
                    self.active = Some((start, reply));
                }
                Phase::Idle
            }
            0x2 | 0x8..=0xB => Phase::Payload {
                started: false,
                bits: 0,
                value: 0,
            },
            _ => Phase::Idle,
        }
    }
}

fn log_push(log: &mut Vec<u8, LOG_LEN>, value: u8) {
    if log.is_full() {
        log.remove(0);
    }
    let _ = log.push(value);
}

/// The data line of a [`SimBus`].
pub struct SimLine<'a> {
    bus: &'a RefCell<SimBus>,
}

impl<'a> SimLine<'a> {
    /// Creates a line attached to `bus`.
    pub fn new(bus: &'a RefCell<SimBus>) -> Self {
        Self { bus }
    }
}

impl AdbLine for SimLine<'_> {
    type Error = Infallible;

    fn reset(&mut self) -> Result<(), Infallible> {
        self.bus.borrow_mut().release();
        Ok(())
    }

    fn read(&mut self) -> Result<bool, Infallible> {
        Ok(self.bus.borrow().level())
    }

    fn drive_low(&mut self) -> Result<(), Infallible> {
        self.bus.borrow_mut().drive_low();
        Ok(())
    }

    fn release_high(&mut self) -> Result<(), Infallible> {
        self.bus.borrow_mut().release();
        Ok(())
    }
}

/// The microsecond clock of a [`SimBus`].
pub struct SimClock<'a> {
    bus: &'a RefCell<SimBus>,
}

impl<'a> SimClock<'a> {
    /// Creates a clock attached to `bus`.
    pub fn new(bus: &'a RefCell<SimBus>) -> Self {
        Self { bus }
    }
}

impl Timebase for SimClock<'_> {
    fn now_us(&mut self) -> u32 {
        let mut bus = self.bus.borrow_mut();
        bus.advance(1);
        bus.now
    }

    fn delay_us(&mut self, us: u32) {
        self.bus.borrow_mut().advance(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_waveform_encodes_bits() {
        let reply = Reply::bytes(&[0x80]);
        let segments: std::vec::Vec<_> = reply.segments().collect();
        assert_eq!(segments.len(), 18);
        assert_eq!(segments[0], (false, BIT_LONG_US));
        assert_eq!(segments[1], (true, BIT_SHORT_US));
        assert_eq!(segments[2], (false, BIT_SHORT_US));
        assert_eq!(segments[3], (true, BIT_LONG_US));
        assert_eq!(&segments[16..], &STOP);
        assert!(reply.tail());
    }

    #[test]
    fn truncated_reply_ends_on_a_low() {
        let reply = Reply::bytes(&[0x00]).truncated_after(2);
        let segments: std::vec::Vec<_> = reply.segments().collect();
        assert_eq!(segments.len(), 18 + 3);
        assert_eq!(segments.last(), Some(&(false, BIT_LONG_US)));
    }

    #[test]
    fn reply_is_only_played_to_talk_at_device_address() {
        let mut bus = SimBus::new();
        bus.push_reply(Reply::bytes(&[0x01])).unwrap();
        assert_eq!(bus.command_done(0x33), Phase::Idle);
        assert!(bus.active.is_none());
        assert_eq!(bus.command_done(0x23), Phase::Idle);
        assert!(bus.active.is_some());
        assert!(matches!(bus.command_done(0x22), Phase::Payload { .. }));
    }

    #[test]
    fn host_low_wins_over_device() {
        let bus = RefCell::new(SimBus::new());
        let mut line = SimLine::new(&bus);
        assert!(line.read().unwrap());
        line.drive_low().unwrap();
        assert!(!line.read().unwrap());
        line.release_high().unwrap();
        assert!(line.read().unwrap());
    }

    #[test]
    fn clock_advances_on_read() {
        let bus = RefCell::new(SimBus::starting_at(u32::MAX));
        let mut clock = SimClock::new(&bus);
        assert_eq!(clock.now_us(), 0);
        clock.delay_us(10);
        assert_eq!(clock.now_us(), 11);
    }
}

//! The core implementation of the ADB host protocol engine.

pub(crate) mod err;

use heapless::Vec;

use crate::cmd::{self, address};
use crate::line::AdbLine;
use crate::timing::*;

pub use self::err::{AdbError, ErrorKind};

/// Maximum number of bytes a device returns for one TALK.
pub const MAX_RESPONSE_LEN: usize = 8;

/// The bytes received by one TALK transaction.
pub type Response = Vec<u8, MAX_RESPONSE_LEN>;

/// An ADB host bit-banging the protocol on one data line.
///
/// Every transaction borrows the host mutably and runs to completion before
/// returning, so two transactions can never be interleaved on the wire.
pub struct AdbHost<L, T> {
    line: L,
    timebase: T,
}

impl<L, T, E> AdbHost<L, T>
where
    L: AdbLine<Error = E>,
    T: Timebase,
    E: core::fmt::Debug,
{
    /// Creates a new `AdbHost`.
    ///
    /// # Arguments
    ///
    /// * `line` - The open-drain ADB data line.
    /// * `timebase` - A microsecond counter and busy-wait delay.
    pub fn new(line: L, timebase: T) -> Self {
        Self { line, timebase }
    }

    /// Releases the line and lets the bus settle.
    pub fn init(&mut self) -> Result<(), AdbError<E>> {
        self.line.reset().map_err(AdbError::Pin)?;
        self.timebase.delay_us(INIT_SETTLE_US);
        log::trace!("adb::init done");
        Ok(())
    }

    /// Current value of the host's microsecond counter.
    pub fn now_us(&mut self) -> u32 {
        self.timebase.now_us()
    }

    /// The timebase, for callers that need delays between transactions.
    pub fn timebase_mut(&mut self) -> &mut T {
        &mut self.timebase
    }

    /// Gives back the line and the timebase.
    pub fn release(self) -> (L, T) {
        (self.line, self.timebase)
    }

    /// Runs one command and reads the device's reply into `buf`.
    ///
    /// Returns the number of whole bytes received. A reply that stops after at
    /// least one byte is a normal, successful end of transmission. On
    /// [`AdbError::MissingStopBit`] the bytes received so far are left in
    /// `buf`.
    pub fn request(
        &mut self,
        address: u8,
        command: u8,
        buf: &mut [u8; MAX_RESPONSE_LEN],
    ) -> Result<usize, AdbError<E>> {
        self.send_command(cmd::request_byte(address, command))?;

        if !self.wait_for_level(false)? {
            return Err(AdbError::NoResponse);
        }

        buf.fill(0);
        for byte in 0..MAX_RESPONSE_LEN {
            let mut data = 0u8;
            for _ in 0..8 {
                if !self.wait_for_level(true)? {
                    return end_of_frame(byte);
                }
                let bit_start = self.timebase.now_us();

                if !self.wait_for_level(false)? {
                    return end_of_frame(byte);
                }
                let high_us = self.timebase.now_us().wrapping_sub(bit_start);

                data = (data << 1) | decode_bit(high_us) as u8;
            }
            buf[byte] = data;
            let received = byte + 1;

            if !self.wait_for_level(true)? {
                return Err(AdbError::MissingStopBit { received });
            }

            if !self.wait_for_level(false)? {
                return Ok(received);
            }
        }

        Ok(MAX_RESPONSE_LEN)
    }

    /// Sends a TALK-style command and collects the reply.
    pub fn talk(&mut self, address: u8, command: u8) -> Result<Response, AdbError<E>> {
        let mut buf = [0u8; MAX_RESPONSE_LEN];
        let len = self.request(address, command, &mut buf)?;
        Ok(buf[..len].iter().copied().collect())
    }

    /// Sends a command followed by a payload for the device to accept.
    ///
    /// The payload is framed like a device reply: a `1` start bit, the bytes
    /// MSB-first and a stop bit. No reply is awaited.
    pub fn listen(&mut self, address: u8, command: u8, payload: &[u8]) -> Result<(), AdbError<E>> {
        let request = cmd::request_byte(address, command);
        self.send_command(request)?;

        self.timebase.delay_us(STOP_TO_START_US);
        self.send_bit(true)?;
        for &byte in payload {
            self.send_byte(byte)?;
        }
        self.send_stop_bit()?;
        log::trace!("adb::listen {request:02X} payload {payload:02X?}");
        Ok(())
    }

    /// Polls register 0 of the keyboard for key transition codes.
    pub fn keyboard_talk(&mut self) -> Result<Response, AdbError<E>> {
        self.talk(address::KEYBOARD, cmd::TALK)
    }

    /// Writes one byte (the LED state) to the keyboard.
    pub fn keyboard_listen(&mut self, led: u8) -> Result<(), AdbError<E>> {
        self.listen(address::KEYBOARD, cmd::LISTEN, &[led])
    }

    /// Polls the mouse. The report is returned undecoded.
    pub fn mouse_talk(&mut self) -> Result<Response, AdbError<E>> {
        self.talk(address::MOUSE, cmd::TALK)
    }

    /// Attention, sync, the request byte and its stop bit.
    ///
    /// Leaves the line released so the addressed device can take the bus.
    fn send_command(&mut self, request: u8) -> Result<(), AdbError<E>> {
        self.pulse(ATTENTION_LOW_US, ATTENTION_HIGH_US)?;
        self.send_byte(request)?;
        self.send_stop_bit()
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), AdbError<E>> {
        for i in (0..8).rev() {
            self.send_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    #[inline]
    fn send_bit(&mut self, bit: bool) -> Result<(), AdbError<E>> {
        let (low_us, high_us) = encode_bit(bit);
        self.pulse(low_us, high_us)
    }

    fn send_stop_bit(&mut self) -> Result<(), AdbError<E>> {
        self.line.drive_low().map_err(AdbError::Pin)?;
        self.timebase.delay_us(STOP_BIT_LOW_US);
        self.line.release_high().map_err(AdbError::Pin)
    }

    #[inline]
    fn pulse(&mut self, low_us: u32, high_us: u32) -> Result<(), AdbError<E>> {
        self.line.drive_low().map_err(AdbError::Pin)?;
        self.timebase.delay_us(low_us);
        self.line.release_high().map_err(AdbError::Pin)?;
        self.timebase.delay_us(high_us);
        Ok(())
    }

    /// Busy-waits until the line reads `level`.
    ///
    /// Returns `false` once more than [`TIMEOUT_US`] have passed since the
    /// wait started.
    #[inline]
    fn wait_for_level(&mut self, level: bool) -> Result<bool, AdbError<E>> {
        let deadline = Deadline::after(self.timebase.now_us(), TIMEOUT_US);
        loop {
            if self.line.read().map_err(AdbError::Pin)? == level {
                return Ok(true);
            }
            if deadline.is_expired(self.timebase.now_us()) {
                return Ok(false);
            }
        }
    }
}

/// Outcome of an edge timeout inside a byte: a clean end of transmission
/// once at least one byte is in, no data otherwise.
fn end_of_frame<E>(received: usize) -> Result<usize, AdbError<E>> {
    if received > 0 {
        Ok(received)
    } else {
        Err(AdbError::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Reply, SimBus, SimClock, SimLine};
    use core::cell::RefCell;

    fn host(bus: &RefCell<SimBus>) -> AdbHost<SimLine<'_>, SimClock<'_>> {
        AdbHost::new(SimLine::new(bus), SimClock::new(bus))
    }

    #[test]
    fn end_of_frame_policy() {
        assert_eq!(end_of_frame::<()>(0), Err(AdbError::NoData));
        assert_eq!(end_of_frame::<()>(3), Ok(3));
    }

    #[test]
    fn init_releases_line() {
        let bus = RefCell::new(SimBus::new());
        let mut host = host(&bus);
        host.init().unwrap();
        assert!(!bus.borrow().host_driving());
        assert!(bus.borrow().now() >= INIT_SETTLE_US);
    }

    #[test]
    fn talk_collects_bytes() {
        let bus = RefCell::new(SimBus::new());
        bus.borrow_mut().push_reply(Reply::bytes(&[0x21, 0xFF])).unwrap();
        let mut host = host(&bus);

        let response = host.keyboard_talk().unwrap();
        assert_eq!(&response[..], &[0x21, 0xFF]);
        assert_eq!(bus.borrow().commands(), &[0x23]);
    }

    #[test]
    fn request_zeroes_stale_buffer() {
        let bus = RefCell::new(SimBus::new());
        bus.borrow_mut().push_reply(Reply::bytes(&[0x12])).unwrap();
        let mut host = host(&bus);

        let mut buf = [0xAA; MAX_RESPONSE_LEN];
        assert_eq!(host.request(address::KEYBOARD, cmd::TALK, &mut buf), Ok(1));
        assert_eq!(buf, [0x12, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn listen_sends_payload_without_waiting() {
        let bus = RefCell::new(SimBus::new());
        let mut host = host(&bus);

        host.keyboard_listen(0x05).unwrap();
        let bus = bus.borrow();
        assert_eq!(bus.commands(), &[0x22]);
        assert_eq!(bus.payload(), &[0x05]);
        assert!(!bus.host_driving());
    }
}

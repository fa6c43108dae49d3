//! Core implementation of the ADB keyboard driver.

use adb_host::{cmd, AdbHost, AdbLine, ErrorKind, Timebase};
use embassy_time::Duration;
use embedded_hal::digital::OutputPin;

use crate::conf::Config;
use crate::err::KeyboardError;
use crate::led::{AdbLeds, LockState};
use crate::matrix::{KeyMatrix, Matrix};

/// A polled ADB keyboard.
///
/// Owns the host (and with it the data line), the optional bus power pin,
/// both key matrices and the last LED state. The power pin may have its own
/// error type.
pub struct AdbKeyboard<L, T, P> {
    host: AdbHost<L, T>,
    power: Option<P>,
    config: Config,
    matrix: Matrix,
    leds: LockState,
}

impl<L, T, P, E> AdbKeyboard<L, T, P>
where
    L: AdbLine<Error = E>,
    T: Timebase,
    P: OutputPin,
    E: core::fmt::Debug,
{
    /// Creates a new `AdbKeyboard`.
    ///
    /// # Arguments
    ///
    /// * `host` - The ADB host driving the data line.
    /// * `power` - An optional output pin switching the bus power.
    /// * `config` - Driver configuration.
    pub fn new(host: AdbHost<L, T>, power: Option<P>, config: Config) -> Self {
        Self {
            host,
            power,
            config,
            matrix: Matrix::new(),
            leds: LockState::NONE,
        }
    }

    /// Powers the bus, waits for the keyboard to come up and resets all state.
    ///
    /// The LEDs are switched off as the last step.
    pub fn init(&mut self) -> Result<(), KeyboardError<E, P::Error>> {
        if let Some(power) = &mut self.power {
            power.set_high().map_err(KeyboardError::Power)?;
        }
        self.settle(self.config.power_up_delay);

        self.host.init()?;
        self.matrix.clear();
        self.set_leds(LockState::NONE);
        log::debug!("adb keyboard initialized");
        Ok(())
    }

    /// Polls the keyboard once.
    ///
    /// Returns the number of key events in the reply. Every failure, including
    /// a truncated frame, counts as "no events this tick" and leaves both
    /// matrices untouched.
    pub fn scan(&mut self) -> u8 {
        let reply = match self.host.talk(self.config.keyboard_address, cmd::TALK) {
            Ok(reply) => reply,
            Err(err) => {
                match err.kind() {
                    ErrorKind::NoResponse => log::trace!("adb keyboard: no response"),
                    _ => log::debug!("adb keyboard: scan failed: {err:?}"),
                }
                return 0;
            }
        };
        if reply.is_empty() {
            return 0;
        }

        let events = self.matrix.ingest(&reply);
        let now = self.host.now_us();
        if self.matrix.commit_scan(now) {
            log::trace!("adb keyboard: matrix changed, reply {:02X?}", &reply[..]);
        }
        events
    }

    /// Bitmask of a debounced matrix row (bit n = column n down).
    pub fn row(&self, row: usize) -> u8 {
        self.matrix.row(row)
    }

    /// Whether the key at (`row`, `col`) is down in the debounced matrix.
    pub fn is_on(&self, row: usize, col: usize) -> bool {
        self.matrix.is_on(row, col)
    }

    /// Whether the debounced matrix changed within the last `window`.
    pub fn is_modified_within(&mut self, window: Duration) -> bool {
        let window_us = window.as_micros().min(u32::MAX as u64) as u32;
        let now = self.host.now_us();
        self.matrix.is_recently_modified(window_us, now)
    }

    /// [`Self::is_modified_within`] the configured debounce window.
    pub fn is_modified(&mut self) -> bool {
        self.is_modified_within(self.config.debounce)
    }

    /// Sends the lock state to the keyboard's LEDs.
    ///
    /// Best effort: a failed write is logged and otherwise ignored.
    pub fn set_leds(&mut self, locks: LockState) {
        self.leds = locks;
        let leds = AdbLeds::from(locks);
        let command = match self.config.led_register {
            Some(register) => cmd::listen_register(register),
            None => cmd::LISTEN,
        };
        if let Err(err) = self
            .host
            .listen(self.config.keyboard_address, command, &[leds.bits()])
        {
            log::debug!("adb keyboard: LED write failed: {err:?}");
        }
    }

    /// The lock state most recently passed to [`Self::set_leds`].
    pub fn leds(&self) -> LockState {
        self.leds
    }

    /// The debounced matrix.
    pub fn matrix(&self) -> &KeyMatrix {
        self.matrix.debounced()
    }

    /// Dumps the debounced matrix at debug level.
    pub fn log_matrix(&self) {
        log::debug!("adb keyboard matrix:\n{}", self.matrix());
    }

    /// Gives back the host and the power pin.
    pub fn release(self) -> (AdbHost<L, T>, Option<P>) {
        (self.host, self.power)
    }

    fn settle(&mut self, delay: Duration) {
        let ms = delay.as_millis().min(u32::MAX as u64) as u32;
        self.host.timebase_mut().delay_ms(ms);
    }
}

//! The ADB data line.
//!
//! ADB is open-drain: the host and the device may only pull the wire low.
//! A high level is produced by a pull-up once every participant lets go, so
//! "driving high" always means releasing the line.

use embedded_hal::digital::{InputPin, OutputPin};

/// A single open-drain wire that can be pulled low, released and sampled.
pub trait AdbLine {
    /// Error type of the underlying GPIO.
    type Error: core::fmt::Debug;

    /// Puts the line into its idle state (released, pulled up).
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Samples the line. `true` means high.
    fn read(&mut self) -> Result<bool, Self::Error>;

    /// Pulls the line low.
    fn drive_low(&mut self) -> Result<(), Self::Error>;

    /// Releases the line so the pull-up (or the device) determines its level.
    fn release_high(&mut self) -> Result<(), Self::Error>;
}

/// An [`AdbLine`] backed by a single GPIO in open-drain mode.
///
/// The pin must be configured as open-drain output with its input buffer
/// enabled and a pull-up (internal or external) on the wire, so that
/// `set_high` releases the bus and `is_high` reads the wire itself.
pub struct OpenDrainLine<P> {
    pin: P,
}

impl<P, E> OpenDrainLine<P>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
    E: core::fmt::Debug,
{
    /// Creates a new `OpenDrainLine`.
    ///
    /// # Arguments
    ///
    /// * `pin` - A pin implementing both `InputPin` and `OutputPin`.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Releases the underlying pin.
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P, E> AdbLine for OpenDrainLine<P>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
    E: core::fmt::Debug,
{
    type Error = E;

    fn reset(&mut self) -> Result<(), E> {
        self.pin.set_high()
    }

    #[inline]
    fn read(&mut self) -> Result<bool, E> {
        self.pin.is_high()
    }

    #[inline]
    fn drive_low(&mut self) -> Result<(), E> {
        self.pin.set_low()
    }

    #[inline]
    fn release_high(&mut self) -> Result<(), E> {
        self.pin.set_high()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    /// A pin whose wire is held low by a device whenever `device_low` is set.
    #[derive(Default)]
    struct WiredPin {
        driven_low: bool,
        device_low: bool,
    }

    impl ErrorType for WiredPin {
        type Error = Infallible;
    }

    impl InputPin for WiredPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(!self.driven_low && !self.device_low)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    impl OutputPin for WiredPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.driven_low = true;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.driven_low = false;
            Ok(())
        }
    }

    #[test]
    fn drive_and_release() {
        let mut line = OpenDrainLine::new(WiredPin::default());
        line.reset().unwrap();
        assert!(line.read().unwrap());
        line.drive_low().unwrap();
        assert!(!line.read().unwrap());
        line.release_high().unwrap();
        assert!(line.read().unwrap());
    }

    #[test]
    fn released_line_reads_device_level() {
        let mut line = OpenDrainLine::new(WiredPin {
            driven_low: false,
            device_low: true,
        });
        line.release_high().unwrap();
        assert!(!line.read().unwrap());

        let pin = line.release();
        assert!(pin.device_low);
    }
}

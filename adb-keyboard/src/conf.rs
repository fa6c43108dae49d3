//! Driver configuration.

use adb_host::cmd::address;
use embassy_time::Duration;

/// Configuration parameters for an `AdbKeyboard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// How long to wait after switching the bus power on before talking to
    /// the keyboard.
    pub power_up_delay: Duration,
    /// Window used by `AdbKeyboard::is_modified`.
    pub debounce: Duration,
    /// Bus address of the keyboard.
    pub keyboard_address: u8,
    /// Register to fold into the LED LISTEN command.
    ///
    /// `None` sends a bare LISTEN (`0x22` for the default address). `Some(2)`
    /// addresses the LED register explicitly (`0x2A`), which is what the ADB
    /// framing specifies; not every converter has been verified with it.
    pub led_register: Option<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            power_up_delay: Duration::from_millis(1000),
            debounce: Duration::from_millis(5),
            keyboard_address: address::KEYBOARD,
            led_register: None,
        }
    }
}

//! ADB command bytes, default device addresses and register numbers.
//!
//! A request byte is the 4-bit device address in the high nibble and the
//! 4-bit command in the low nibble.

/// Reset all devices on the bus.
pub const RESET: u8 = 0;
/// Flush the addressed device's internal state.
pub const FLUSH: u8 = 1;
/// Send data to the addressed device.
pub const LISTEN: u8 = 2;
/// Ask the addressed device to send data.
pub const TALK: u8 = 3;

/// Default device addresses.
pub mod address {
    /// Encryption dongle.
    pub const DONGLE: u8 = 1;
    /// Keyboard.
    pub const KEYBOARD: u8 = 2;
    /// Relative position device (mouse).
    pub const MOUSE: u8 = 3;
    /// Absolute position device (tablet).
    pub const TABLET: u8 = 4;
    /// Modem.
    pub const MODEM: u8 = 5;
    /// Reserved.
    pub const RESERVED: u8 = 6;
    /// Miscellaneous appliance.
    pub const MISC: u8 = 7;
}

/// Keyboard register numbers.
pub mod register {
    /// Key transition codes.
    pub const KBD_MAP: u8 = 0;
    /// LED state.
    pub const KBD_LED: u8 = 2;
}

/// Builds the request byte sent after the attention signal.
///
/// Both arguments are truncated to their low nibble.
///
/// # Example
///
/// ```
/// use adb_host::cmd::{address, request_byte, TALK};
///
/// assert_eq!(request_byte(address::KEYBOARD, TALK), 0x23);
/// ```
pub const fn request_byte(address: u8, command: u8) -> u8 {
    ((address & 0x0F) << 4) | (command & 0x0F)
}

/// A LISTEN command nibble that also carries a register number
/// (`0b10rr`), as used by devices that expect register addressing.
pub const fn listen_register(register: u8) -> u8 {
    0b1000 | (register & 0b11)
}

/// A TALK command nibble that also carries a register number (`0b11rr`).
pub const fn talk_register(register: u8) -> u8 {
    0b1100 | (register & 0b11)
}

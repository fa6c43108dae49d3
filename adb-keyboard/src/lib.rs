//! A `no_std` driver for an Apple Desktop Bus keyboard.
//!
//! This crate provides an `AdbKeyboard` that polls the keyboard through an
//! [`adb_host::AdbHost`], turns its key transition codes into a 16 × 8 key
//! matrix, and publishes a debounced copy of that matrix together with a
//! "recently modified" signal. It also forwards lock-key LED state to the
//! keyboard.
//!
//! # Usage
//!
//! The keycode layer on top only needs [`keyboard::AdbKeyboard::scan`],
//! [`keyboard::AdbKeyboard::row`] and [`keyboard::AdbKeyboard::set_leds`].
//!
//! ```ignore
//! use adb_host::{line::OpenDrainLine, timing::EmbassyTimebase, AdbHost};
//! use adb_keyboard::{conf::Config, keyboard::AdbKeyboard, led::LockState};
//!
//! let data = Flex::new(peripherals.GPIO0); // open-drain, pull-up enabled
//! let power = Output::new(peripherals.GPIO1, Level::Low, OutputConfig::default());
//!
//! let host = AdbHost::new(OpenDrainLine::new(data), EmbassyTimebase);
//! let mut keyboard = AdbKeyboard::new(host, Some(power), Config::default());
//! keyboard.init().unwrap();
//!
//! loop {
//!     if keyboard.scan() > 0 && keyboard.is_modified() {
//!         for row in 0..adb_keyboard::matrix::MATRIX_ROWS {
//!             report(row, keyboard.row(row));
//!         }
//!     }
//!     keyboard.set_leds(LockState::CAPS);
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod conf;
pub mod keyboard;
pub mod led;
pub mod matrix;

mod err;
pub use err::KeyboardError;

//! A blocking, `no_std` host driver for the Apple Desktop Bus (ADB).
//!
//! ADB is a single-wire, open-drain bus where every bit is encoded in the
//! ratio of a low and a high pulse inside a 100 µs cell. This crate bit-bangs
//! that protocol on a plain GPIO: it generates the attention signal and the
//! command byte, then measures the device's pulse widths to decode up to eight
//! response bytes.
//!
//! The main entry point is the [`AdbHost`] struct, which takes an [`AdbLine`]
//! (the data wire) and a [`Timebase`] (a free-running microsecond counter plus
//! a busy-wait delay).
//!
//! # Timing
//!
//! All waits are busy-polls. A transaction assumes the calling context is not
//! preempted for anything close to a bit cell (100 µs); if it is, decoded bit
//! values are unreliable. Run transactions with interrupts masked or from a
//! context with a guaranteed latency budget.
//!
//! # Usage
//!
//! ```ignore
//! use adb_host::{AdbHost, line::OpenDrainLine, timing::EmbassyTimebase};
//!
//! let pin = Flex::new(peripherals.GPIO0); // open-drain, pull-up enabled
//! let mut host = AdbHost::new(OpenDrainLine::new(pin), EmbassyTimebase);
//! host.init()?;
//!
//! match host.keyboard_talk() {
//!     Ok(codes) => log::info!("key transitions: {codes:?}"),
//!     Err(err) => log::trace!("no keyboard data: {err:?}"),
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod cmd;
pub mod line;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod timing;

mod host;
pub use host::*;

pub use line::AdbLine;
pub use timing::Timebase;

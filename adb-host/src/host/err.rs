//! Error types for ADB transactions.

use core::fmt::{self, Debug};

/// The category of an [`AdbError`], independent of the GPIO error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The device never pulled the line low after the command.
    NoResponse,
    /// The device started responding but no first byte could be decoded.
    NoData,
    /// A byte was received but its stop bit never ended.
    MissingStopBit,
    /// The GPIO itself failed.
    Pin,
}

/// The error type for ADB transactions.
pub enum AdbError<E> {
    /// The device is absent or did not acknowledge the command.
    ///
    /// On a polled keyboard this simply means "nothing this tick".
    NoResponse,
    /// The device acknowledged but the first bit timed out.
    NoData,
    /// Frame integrity violation after `received` whole bytes.
    ///
    /// The received bytes are left in the caller's buffer.
    MissingStopBit {
        /// Number of complete bytes received before the violation.
        received: usize,
    },
    /// A GPIO operation on the data line failed.
    Pin(E),
}

impl<E> AdbError<E> {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoResponse => ErrorKind::NoResponse,
            Self::NoData => ErrorKind::NoData,
            Self::MissingStopBit { .. } => ErrorKind::MissingStopBit,
            Self::Pin(_) => ErrorKind::Pin,
        }
    }

    /// Number of whole bytes received before the transaction failed.
    pub fn received(&self) -> usize {
        match self {
            Self::MissingStopBit { received } => *received,
            _ => 0,
        }
    }
}

impl<E: Debug> Debug for AdbError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse => write!(f, "NoResponse"),
            Self::NoData => write!(f, "NoData"),
            Self::MissingStopBit { received } => write!(f, "MissingStopBit({received})"),
            Self::Pin(err) => write!(f, "Pin({err:?})"),
        }
    }
}

impl<E: PartialEq> PartialEq for AdbError<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NoResponse, Self::NoResponse) | (Self::NoData, Self::NoData) => true,
            (Self::MissingStopBit { received: a }, Self::MissingStopBit { received: b }) => a == b,
            (Self::Pin(a), Self::Pin(b)) => a == b,
            _ => false,
        }
    }
}

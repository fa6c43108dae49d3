//! Error type for keyboard bring-up.

use core::fmt::{self, Debug};

use adb_host::AdbError;

/// An error from the data line (`E`) or the bus power pin (`PE`).
pub enum KeyboardError<E, PE> {
    /// The ADB host failed.
    Adb(AdbError<E>),
    /// Switching the bus power failed.
    Power(PE),
}

impl<E, PE> From<AdbError<E>> for KeyboardError<E, PE> {
    fn from(err: AdbError<E>) -> Self {
        Self::Adb(err)
    }
}

impl<E: Debug, PE: Debug> Debug for KeyboardError<E, PE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adb(err) => write!(f, "Adb({err:?})"),
            Self::Power(err) => write!(f, "Power({err:?})"),
        }
    }
}

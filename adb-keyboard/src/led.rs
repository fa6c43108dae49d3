//! Lock-key LED encoding.

use core::ops::BitOr;

/// Lock state as reported by the host, in USB HID LED bit order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LockState(pub u8);

impl LockState {
    /// No lock active.
    pub const NONE: Self = Self(0);
    /// Num Lock.
    pub const NUM: Self = Self(1 << 0);
    /// Caps Lock.
    pub const CAPS: Self = Self(1 << 1);
    /// Scroll Lock.
    pub const SCROLL: Self = Self(1 << 2);

    /// Whether every lock in `other` is active.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LockState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The byte written to the keyboard's LED register.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AdbLeds(u8);

impl AdbLeds {
    /// Num Lock LED.
    pub const NUM: u8 = 0x01;
    /// Caps Lock LED.
    pub const CAPS: u8 = 0x02;
    /// Scroll Lock LED.
    pub const SCROLL: u8 = 0x04;

    /// The raw LED byte.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether the Num Lock LED is lit.
    pub fn is_num(self) -> bool {
        self.0 & Self::NUM != 0
    }

    /// Whether the Caps Lock LED is lit.
    pub fn is_caps(self) -> bool {
        self.0 & Self::CAPS != 0
    }

    /// Whether the Scroll Lock LED is lit.
    pub fn is_scroll(self) -> bool {
        self.0 & Self::SCROLL != 0
    }
}

impl From<LockState> for AdbLeds {
    fn from(locks: LockState) -> Self {
        let mut bits = 0;
        if locks.contains(LockState::CAPS) {
            bits |= Self::CAPS;
        }
        if locks.contains(LockState::NUM) {
            bits |= Self::NUM;
        }
        if locks.contains(LockState::SCROLL) {
            bits |= Self::SCROLL;
        }
        Self(bits)
    }
}

impl core::fmt::Debug for AdbLeds {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdbLeds")
            .field("num", &self.is_num())
            .field("caps", &self.is_caps())
            .field("scroll", &self.is_scroll())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LockState::NONE, 0x00)]
    #[case(LockState::CAPS, 0x02)]
    #[case(LockState::NUM, 0x01)]
    #[case(LockState::SCROLL, 0x04)]
    #[case(LockState::CAPS | LockState::SCROLL, 0x06)]
    #[case(LockState::NUM | LockState::CAPS | LockState::SCROLL, 0x07)]
    fn lock_state_to_led_byte(#[case] locks: LockState, #[case] bits: u8) {
        assert_eq!(AdbLeds::from(locks).bits(), bits);
    }

    #[test]
    fn unknown_lock_bits_are_dropped() {
        // Compose and Kana have no ADB LED.
        assert_eq!(AdbLeds::from(LockState(0b1_1000)).bits(), 0);
    }

    #[test]
    fn led_queries() {
        let leds = AdbLeds::from(LockState::CAPS);
        assert!(leds.is_caps());
        assert!(!leds.is_num());
        assert!(!leds.is_scroll());
    }
}

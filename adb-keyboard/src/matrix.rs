//! Key matrix and debounce state.
//!
//! An ADB keyboard reports key transitions, not a key map: each byte of a
//! register 0 reply is one key going down or up. The 7-bit key code is split
//! into a row (upper 4 bits) and a column (lower 3 bits) of a 16 × 8 matrix.
//!
//! Two matrices are kept. The live matrix follows every transition; the
//! debounced matrix is copied from it once per scan, and any difference
//! raises the modification flag. There is no per-key settle time.

use core::fmt;

/// Number of rows in the matrix.
pub const MATRIX_ROWS: usize = 16;
/// Number of columns per row.
pub const MATRIX_COLS: usize = 8;

/// Key code sent as padding when a reply carries an odd number of events.
pub const FILLER_CODE: u8 = 0x7F;

const RELEASE_FLAG: u8 = 0x80;
const CODE_MASK: u8 = 0x7F;

/// A modification stamp older than this is past any window a caller can ask
/// about; beyond it the wrapping counter would make it look recent again.
const STALE_US: u32 = u32::MAX / 2;

/// One key transition decoded from a reply byte.
///
/// Only built by [`KeyTransition::from_byte`], so the code is always a 7-bit
/// key code other than the filler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTransition {
    code: u8,
    pressed: bool,
}

impl KeyTransition {
    /// Decodes a reply byte. Returns `None` for the filler code.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let code = byte & CODE_MASK;
        if code == FILLER_CODE {
            return None;
        }
        Some(Self {
            code,
            pressed: byte & RELEASE_FLAG == 0,
        })
    }

    /// 7-bit ADB key code.
    pub fn code(&self) -> u8 {
        self.code
    }

    /// `true` for key down, `false` for key up.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Matrix row of this key.
    pub fn row(&self) -> usize {
        (self.code >> 3) as usize
    }

    /// Matrix column of this key.
    pub fn col(&self) -> usize {
        (self.code & 0x07) as usize
    }
}

/// A 16 × 8 key matrix, one bitmask per row (bit set = key down).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyMatrix {
    rows: [u8; MATRIX_ROWS],
}

impl KeyMatrix {
    /// An empty matrix.
    pub const fn new() -> Self {
        Self {
            rows: [0; MATRIX_ROWS],
        }
    }

    /// Bitmask of `row`. Rows past the end read as 0.
    pub fn row(&self, row: usize) -> u8 {
        self.rows.get(row).copied().unwrap_or(0)
    }

    /// Whether the key at (`row`, `col`) is down.
    pub fn is_on(&self, row: usize, col: usize) -> bool {
        col < MATRIX_COLS && self.row(row) & (1 << col) != 0
    }

    /// Applies one transition.
    pub fn apply(&mut self, transition: KeyTransition) {
        let mask = 1 << transition.col();
        let Some(row) = self.rows.get_mut(transition.row()) else {
            return;
        };
        if transition.pressed {
            *row |= mask;
        } else {
            *row &= !mask;
        }
    }

    /// Releases every key.
    pub fn clear(&mut self) {
        self.rows = [0; MATRIX_ROWS];
    }
}

/// Prints the matrix as a table, one row per line, column 0 first.
impl fmt::Display for KeyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "r/c 01234567")?;
        for (row, bits) in self.rows.iter().enumerate() {
            writeln!(f, "{row:02X}: {:08b}", bits.reverse_bits())?;
        }
        Ok(())
    }
}

/// Live and debounced matrices plus the modification state.
///
/// Timestamps are microsecond counter values and are compared with wrapping
/// subtraction.
#[derive(Debug, Default, Clone)]
pub struct Matrix {
    live: KeyMatrix,
    debounced: KeyMatrix,
    modified: bool,
    last_modified: u32,
}

impl Matrix {
    /// Both matrices empty, not modified.
    pub const fn new() -> Self {
        Self {
            live: KeyMatrix::new(),
            debounced: KeyMatrix::new(),
            modified: false,
            last_modified: 0,
        }
    }

    /// Applies the transitions in `reply` to the live matrix.
    ///
    /// Returns the number of bytes that were key events (fillers excluded).
    pub fn ingest(&mut self, reply: &[u8]) -> u8 {
        let mut events = 0;
        for transition in reply.iter().copied().filter_map(KeyTransition::from_byte) {
            self.live.apply(transition);
            events += 1;
        }
        events
    }

    /// Publishes the live matrix.
    ///
    /// Returns `true` and stamps `now` if any row changed. A scan without
    /// change drops a modification flag that has gone stale, so the flag
    /// survives counter wraparound as long as scans keep running.
    pub fn commit_scan(&mut self, now: u32) -> bool {
        if self.live == self.debounced {
            if now.wrapping_sub(self.last_modified) > STALE_US {
                self.modified = false;
            }
            return false;
        }
        self.debounced = self.live;
        self.modified = true;
        self.last_modified = now;
        true
    }

    /// True if the debounced matrix changed and no more than `window_us` has
    /// passed since.
    ///
    /// The flag clears itself on the first query after the window.
    pub fn is_recently_modified(&mut self, window_us: u32, now: u32) -> bool {
        if self.modified && now.wrapping_sub(self.last_modified) > window_us {
            self.modified = false;
        }
        self.modified
    }

    /// Row of the debounced matrix.
    pub fn row(&self, row: usize) -> u8 {
        self.debounced.row(row)
    }

    /// Key state in the debounced matrix.
    pub fn is_on(&self, row: usize, col: usize) -> bool {
        self.debounced.is_on(row, col)
    }

    /// The debounced matrix.
    pub fn debounced(&self) -> &KeyMatrix {
        &self.debounced
    }

    /// The live matrix.
    pub fn live(&self) -> &KeyMatrix {
        &self.live
    }

    /// Empties both matrices and drops the modification flag.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn every_code_lands_inside_the_matrix() {
        for code in 0..FILLER_CODE {
            for byte in [code, code | RELEASE_FLAG] {
                let transition = KeyTransition::from_byte(byte).unwrap();
                assert!(transition.row() < MATRIX_ROWS);
                assert!(transition.col() < MATRIX_COLS);
                assert_eq!(transition.row() * MATRIX_COLS + transition.col(), code as usize);
            }
        }
    }

    #[rstest]
    #[case(0x7F)]
    #[case(0xFF)]
    fn filler_is_ignored(#[case] byte: u8) {
        assert_eq!(KeyTransition::from_byte(byte), None);

        let mut matrix = Matrix::new();
        assert_eq!(matrix.ingest(&[byte]), 0);
        assert_eq!(matrix.live(), &KeyMatrix::new());
    }

    #[test]
    fn release_flag() {
        let down = KeyTransition::from_byte(0x21).unwrap();
        assert_eq!((down.code(), down.is_pressed()), (0x21, true));

        let up = KeyTransition::from_byte(0xA1).unwrap();
        assert_eq!((up.code(), up.is_pressed()), (0x21, false));
    }

    #[test]
    fn any_byte_applies_without_touching_the_filler_slot() {
        let mut matrix = KeyMatrix::new();
        for byte in 0..=u8::MAX {
            if let Some(transition) = KeyTransition::from_byte(byte) {
                assert!(transition.code() < FILLER_CODE);
                matrix.apply(transition);
            }
            assert!(!matrix.is_on(15, 7), "byte {byte:02X}");
        }
    }

    #[test]
    fn press_is_idempotent() {
        let mut matrix = Matrix::new();
        matrix.ingest(&[0x21]);
        let once = *matrix.live();
        matrix.ingest(&[0x21]);
        assert_eq!(matrix.live(), &once);
        assert_eq!(once.row(4), 0b0000_0010);
    }

    #[test]
    fn press_then_release_restores_state() {
        let mut matrix = Matrix::new();
        matrix.ingest(&[0x00, 0x3B]);
        let before = *matrix.live();

        assert_eq!(matrix.ingest(&[0x12, 0x92]), 2);
        assert_eq!(matrix.live(), &before);
    }

    #[test]
    fn scenario_reply_sets_row_4_col_1() {
        let mut matrix = Matrix::new();
        assert_eq!(matrix.ingest(&[0x21, 0xFF]), 1);
        assert!(matrix.commit_scan(10));
        assert!(matrix.is_on(4, 1));
        assert_eq!(matrix.row(4), 0x02);
        for row in (0..MATRIX_ROWS).filter(|&row| row != 4) {
            assert_eq!(matrix.row(row), 0);
        }
    }

    #[test]
    fn live_changes_are_invisible_until_commit() {
        let mut matrix = Matrix::new();
        matrix.ingest(&[0x05]);
        assert_eq!(matrix.row(0), 0);
        matrix.commit_scan(0);
        assert_eq!(matrix.row(0), 0b0010_0000);
    }

    #[test]
    fn commit_only_flags_real_changes() {
        let mut matrix = Matrix::new();
        assert!(!matrix.commit_scan(100));
        assert!(!matrix.is_recently_modified(1_000, 100));

        matrix.ingest(&[0x10]);
        assert!(matrix.commit_scan(200));
        assert!(!matrix.commit_scan(300));
        assert!(!matrix.commit_scan(400));
        assert!(matrix.is_recently_modified(1_000, 400));
    }

    #[test]
    fn down_then_up_within_one_scan_publishes_nothing() {
        let mut matrix = Matrix::new();
        matrix.ingest(&[0x10, 0x90]);
        assert!(!matrix.commit_scan(0));
    }

    #[rstest]
    #[case(4_999, true)]
    #[case(5_000, true)]
    #[case(5_001, false)]
    fn modification_window(#[case] elapsed: u32, #[case] modified: bool) {
        let mut matrix = Matrix::new();
        matrix.ingest(&[0x10]);
        matrix.commit_scan(1_000);
        assert_eq!(matrix.is_recently_modified(5_000, 1_000 + elapsed), modified);
    }

    #[test]
    fn modification_flag_clears_itself() {
        let mut matrix = Matrix::new();
        matrix.ingest(&[0x10]);
        matrix.commit_scan(u32::MAX - 10);

        assert!(matrix.is_recently_modified(100, 50));
        assert!(!matrix.is_recently_modified(100, 200));
        // Stays cleared even for a wider window afterwards.
        assert!(!matrix.is_recently_modified(10_000, 201));
    }

    #[test]
    fn stale_flag_does_not_return_after_wraparound() {
        let mut matrix = Matrix::new();
        matrix.ingest(&[0x10]);
        matrix.commit_scan(0);

        // Nobody asks for a long time while scans keep coming in.
        assert!(!matrix.commit_scan(1 << 30));
        assert!(!matrix.commit_scan(3 << 30));

        // The counter wraps back to just after the old stamp.
        assert!(!matrix.is_recently_modified(5_000, 10));
    }

    #[test]
    fn recent_flag_survives_unchanged_scans() {
        let mut matrix = Matrix::new();
        matrix.ingest(&[0x10]);
        matrix.commit_scan(u32::MAX - 100);
        assert!(!matrix.commit_scan(200));
        assert!(matrix.is_recently_modified(5_000, 300));
    }

    #[test]
    fn out_of_range_queries() {
        let mut matrix = Matrix::new();
        matrix.ingest(&[0x7E]);
        matrix.commit_scan(0);
        assert!(matrix.is_on(15, 6));
        assert!(!matrix.is_on(15, 8));
        assert_eq!(matrix.row(16), 0);
    }

    #[test]
    fn display_table() {
        let mut matrix = KeyMatrix::new();
        matrix.apply(KeyTransition::from_byte(0x00).unwrap());
        matrix.apply(KeyTransition::from_byte(0x7E).unwrap());

        let text = matrix.to_string();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("r/c 01234567"));
        assert_eq!(lines.next(), Some("00: 10000000"));
        assert_eq!(lines.nth(14), Some("0F: 00000010"));
        assert_eq!(lines.next(), None);
    }
}

/// A single choice made at a min/max node.
///
/// Note that this is a bitfield such that
/// ```rust
/// # use heightmap::vm::Choice;
/// # assert!(
/// Choice::Both as u8 == Choice::Left as u8 | Choice::Right as u8
/// # );
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Choice {
    /// The operation always picks the left-hand input
    Left = 1,

    /// The operation always picks the right-hand input
    Right = 2,

    /// The operation may pick either input
    Both = 3,
}

impl Default for Choice {
    fn default() -> Self {
        Self::Both
    }
}

impl Choice {
    /// Checks whether the left-hand input may be used
    pub fn has_left(&self) -> bool {
        (*self as u8) & (Choice::Left as u8) != 0
    }

    /// Checks whether the right-hand input may be used
    pub fn has_right(&self) -> bool {
        (*self as u8) & (Choice::Right as u8) != 0
    }
}

//! 32位TCP序列号，支持回绕比较。
//! 32-bit TCP sequence numbers with wrapping comparison (RFC 1982 serial arithmetic).

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// A TCP sequence number.
///
/// Ordering wraps around `u32::MAX`: `a < b` when `b` is less than 2^31
/// bytes ahead of `a`.
///
/// TCP 序列号。比较运算支持在 `u32::MAX` 处回绕。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeqNum(u32);

impl SeqNum {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Bytes from `earlier` up to `self`. Zero when `earlier` is not behind.
    pub fn distance_from(self, earlier: SeqNum) -> u32 {
        if self > earlier {
            self.0.wrapping_sub(earlier.0)
        } else {
            0
        }
    }
}

impl PartialOrd for SeqNum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SeqNum {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0.wrapping_sub(other.0) as i32).cmp(&0)
    }
}

impl Add<u32> for SeqNum {
    type Output = SeqNum;

    fn add(self, rhs: u32) -> SeqNum {
        SeqNum(self.0.wrapping_add(rhs))
    }
}

impl Sub<SeqNum> for SeqNum {
    type Output = u32;

    fn sub(self, rhs: SeqNum) -> u32 {
        self.0.wrapping_sub(rhs.0)
    }
}

impl From<u32> for SeqNum {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

use std::{
    fmt,
    ops::{Add, AddAssign, Sub, SubAssign},
};

/// A byte offset into a [`SourceFile`](crate::SourceFile)'s text.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BytePos(pub u32);

impl fmt::Debug for BytePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BytePos({})", self.0)
    }
}

impl BytePos {
    #[inline]
    pub fn from_usize(n: usize) -> Self {
        Self(n as u32)
    }

    #[inline]
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

impl Add for BytePos {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Add<u32> for BytePos {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u32) -> Self {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u32> for BytePos {
    #[inline]
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs;
    }
}

impl Sub for BytePos {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sub<u32> for BytePos {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: u32) -> Self {
        Self(self.0 - rhs)
    }
}

impl SubAssign<u32> for BytePos {
    #[inline]
    fn sub_assign(&mut self, rhs: u32) {
        self.0 -= rhs;
    }
}

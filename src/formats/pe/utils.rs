//! Bounds checking and primitive reads over the mapped region

/// Extension trait for reading little-endian primitives from byte slices.
///
/// Every read is bounds-checked and overflow-safe; an out-of-range request
/// yields `None` rather than panicking.
pub trait ReadExt {
    fn read_u16_le_at(&self, offset: usize) -> Option<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Option<u32>;
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Option<u16> {
        self.read_slice_at(offset, 2)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Option<u32> {
        self.read_slice_at(offset, 4)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }

    #[inline(always)]
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.get(offset..end)
    }
}

/// Bounds-checked view over the whole mapped region.
///
/// This is the single gate between attacker-controlled header fields and
/// typed views: nothing in the overlay parser turns raw bytes into a header
/// without going through [`Region::can_read`].
#[derive(Debug, Clone, Copy)]
pub struct Region<'data> {
    data: &'data [u8],
}

impl<'data> Region<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        Self { data }
    }

    /// Length of the mapped region in bytes.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline(always)]
    pub fn bytes(&self) -> &'data [u8] {
        self.data
    }

    /// True iff `[offset, offset + len)` lies entirely inside the region.
    #[inline(always)]
    pub fn can_read(&self, offset: usize, len: usize) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.data.len())
    }

    /// Borrow `len` bytes at `offset` if they are in range.
    #[inline(always)]
    pub fn slice(&self, offset: usize, len: usize) -> Option<&'data [u8]> {
        if !self.can_read(offset, len) {
            return None;
        }
        Some(&self.data[offset..offset + len])
    }

    /// Overlay a fixed-size structure of `N` bytes at `offset`.
    #[inline(always)]
    pub fn overlay<const N: usize>(&self, offset: usize) -> Option<&'data [u8; N]> {
        self.slice(offset, N)?.try_into().ok()
    }

    #[inline(always)]
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        self.data.read_u16_le_at(offset)
    }

    #[inline(always)]
    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        self.data.read_u32_le_at(offset)
    }
}

// Field readers for already-overlaid fixed-size structures. Offsets are
// compile-time layout constants, always inside `N`.

#[inline(always)]
pub(crate) fn field_u16<const N: usize>(raw: &[u8; N], at: usize) -> u16 {
    u16::from_le_bytes([raw[at], raw[at + 1]])
}

#[inline(always)]
pub(crate) fn field_u32<const N: usize>(raw: &[u8; N], at: usize) -> u32 {
    u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

#[inline(always)]
pub(crate) fn field_u64<const N: usize>(raw: &[u8; N], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&raw[at..at + 8]);
    u64::from_le_bytes(b)
}

//! Section table and RVA/file-offset translation

use crate::formats::pe::types::*;
use crate::formats::pe::utils::Region;

/// Section headers of a parsed image, in file order.
///
/// Table order matters: when sections overlap, the first match wins in every
/// lookup. All translation arithmetic is done in `u64` so that
/// `VirtualAddress + VirtualSize` never overflows.
#[derive(Debug, Clone)]
pub struct SectionTable<'a> {
    headers: Vec<SectionHeader<'a>>,
    region: Region<'a>,
}

impl<'a> SectionTable<'a> {
    pub(crate) fn new(headers: Vec<SectionHeader<'a>>, region: Region<'a>) -> Self {
        Self { headers, region }
    }

    pub fn sections(&self) -> &[SectionHeader<'a>] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionHeader<'a>> {
        self.headers.iter()
    }

    /// First section whose 8-byte name field matches `name`.
    ///
    /// Only the first 8 bytes of `name` take part and comparison stops at the
    /// first NUL, so `".textbss$mn"` finds a `.textbss` header but `".text"`
    /// never matches it.
    pub fn section_by_name(&self, name: &str) -> Option<SectionHeader<'a>> {
        let mut wanted = [0u8; SECTION_NAME_SIZE];
        let len = name.len().min(SECTION_NAME_SIZE);
        wanted[..len].copy_from_slice(&name.as_bytes()[..len]);

        self.headers
            .iter()
            .copied()
            .find(|s| name_field_matches(&s.name_bytes(), &wanted))
    }

    /// First section with `VirtualAddress <= rva <= VirtualAddress + VirtualSize`.
    ///
    /// The upper bound is inclusive so an RVA sitting exactly on a section's
    /// end still resolves to it. RVA 0 never resolves.
    pub fn section_for_rva(&self, rva: u64) -> Option<SectionHeader<'a>> {
        if rva == 0 {
            return None;
        }
        self.headers.iter().copied().find(|s| {
            let start = u64::from(s.virtual_address());
            let end = start + u64::from(s.virtual_size());
            start <= rva && rva <= end
        })
    }

    /// Translate an RVA to a raw file offset.
    ///
    /// Best-effort, never an error:
    /// - `0` maps to `0`;
    /// - with no sections the file and virtual layouts are taken as identical;
    /// - a lone section translates any RVA, even outside its range (the
    ///   subtraction wraps in that case);
    /// - with several sections an unmatched RVA comes back unchanged.
    pub fn rva_to_offset(&self, rva: u64) -> u64 {
        if rva == 0 || self.headers.is_empty() {
            return rva;
        }

        let hit = self.headers.iter().find(|s| {
            let start = u64::from(s.virtual_address());
            start <= rva && rva < start + effective_size(s)
        });
        if let Some(section) = hit {
            return rva - u64::from(section.virtual_address())
                + u64::from(section.pointer_to_raw_data());
        }

        match self.headers.as_slice() {
            [only] => rva
                .wrapping_sub(u64::from(only.virtual_address()))
                .wrapping_add(u64::from(only.pointer_to_raw_data())),
            _ => rva,
        }
    }

    /// Translate a raw file offset to an RVA; `0` when no section's raw
    /// range holds the offset.
    pub fn offset_to_rva(&self, offset: u64) -> u64 {
        if offset == 0 {
            return 0;
        }

        self.headers
            .iter()
            .find(|s| {
                let start = u64::from(s.pointer_to_raw_data());
                start <= offset && offset < start + u64::from(s.size_of_raw_data())
            })
            .map_or(0, |s| {
                offset - u64::from(s.pointer_to_raw_data()) + u64::from(s.virtual_address())
            })
    }

    /// Raw bytes of `section`, clamped to the mapped region.
    pub fn section_data(&self, section: &SectionHeader<'_>) -> &'a [u8] {
        let start = section.pointer_to_raw_data() as usize;
        let available = self.region.len().saturating_sub(start);
        let len = (section.size_of_raw_data() as usize).min(available);
        self.region.slice(start, len).unwrap_or_default()
    }
}

fn name_field_matches(field: &[u8; SECTION_NAME_SIZE], wanted: &[u8; SECTION_NAME_SIZE]) -> bool {
    for (&a, &b) in field.iter().zip(wanted) {
        if a != b {
            return false;
        }
        if a == 0 {
            break;
        }
    }
    true
}

/// Virtual extent used for RVA lookups: `VirtualSize`, or `SizeOfRawData`
/// when the linker left `VirtualSize` at zero.
fn effective_size(section: &SectionHeader<'_>) -> u64 {
    match section.virtual_size() {
        0 => u64::from(section.size_of_raw_data()),
        size => u64::from(size),
    }
}

//! Zero-copy PE/PE32+ overlay parser
//!
//! Parsing happens in two steps. [`Layout::parse`] validates the image and
//! records where every header lives; [`PeFile::bind`] turns a layout back
//! into typed views borrowing the same bytes. [`PeFile::parse`] does both.

use std::borrow::Cow;

pub mod catalog;
pub mod headers;
pub mod sections;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod fixtures;

pub use headers::Layout;
pub use sections::SectionTable;
pub use types::*;

use crate::error::{PeError, Result};
use headers::overlay_optional;
use utils::Region;

/// Typed, bounds-checked view over a parsed PE image.
///
/// Every view borrows directly from the mapped bytes; nothing is copied.
#[derive(Debug, Clone)]
pub struct PeFile<'a> {
    data: &'a [u8],
    layout: Cow<'a, Layout>,
    dos: DosHeader<'a>,
    coff: CoffHeader<'a>,
    optional: OptionalHeader<'a>,
    directories: Vec<DataDirectory<'a>>,
    sections: SectionTable<'a>,
}

impl<'a> PeFile<'a> {
    /// Parse `data` and bind views to it.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let layout = Layout::parse(data)?;
        Self::bind_layout(data, Cow::Owned(layout))
    }

    /// Bind views described by an already validated `layout` to `data`.
    ///
    /// `data` must be the bytes the layout was parsed from, or at least as
    /// long; offsets are re-checked and a shorter region is rejected with the
    /// error the parser would have raised.
    pub fn bind(data: &'a [u8], layout: &'a Layout) -> Result<Self> {
        Self::bind_layout(data, Cow::Borrowed(layout))
    }

    fn bind_layout(data: &'a [u8], layout: Cow<'a, Layout>) -> Result<Self> {
        let region = Region::new(data);

        let dos = region
            .overlay::<DOS_HEADER_SIZE>(0)
            .map(DosHeader::new)
            .ok_or(PeError::NotAPeFile)?;
        let coff = region
            .overlay::<COFF_HEADER_SIZE>(layout.coff_offset())
            .map(CoffHeader::new)
            .ok_or(PeError::MissingCoffHeader {
                offset: layout.coff_offset(),
            })?;
        let optional = overlay_optional(&region, layout.optional_offset(), layout.optional_kind())
            .ok_or(PeError::MissingOptionalHeader {
                offset: layout.optional_offset(),
            })?;

        let directory_offsets = layout.directory_offsets();
        let mut directories = Vec::with_capacity(directory_offsets.len());
        for (valid, &offset) in directory_offsets.iter().enumerate() {
            let raw = region.overlay::<DATA_DIRECTORY_SIZE>(offset).ok_or(
                PeError::TruncatedDirectoryTable {
                    offset: layout.directories_base().unwrap_or(offset),
                    valid,
                    count: directory_offsets.len(),
                },
            )?;
            directories.push(DataDirectory::new(raw));
        }

        let section_offsets = layout.section_offsets();
        let mut headers = Vec::with_capacity(section_offsets.len());
        for (valid, &offset) in section_offsets.iter().enumerate() {
            let raw = region.overlay::<SECTION_HEADER_SIZE>(offset).ok_or(
                PeError::TruncatedSectionTable {
                    offset: layout.sections_base().unwrap_or(offset),
                    valid,
                    count: section_offsets.len(),
                },
            )?;
            headers.push(SectionHeader::new(raw));
        }

        Ok(Self {
            data,
            layout,
            dos,
            coff,
            optional,
            directories,
            sections: SectionTable::new(headers, region),
        })
    }

    /// The whole mapped region.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn filesize(&self) -> usize {
        self.data.len()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn dos_header(&self) -> DosHeader<'a> {
        self.dos
    }

    /// NT signature as read during parsing.
    pub fn signature(&self) -> u32 {
        self.layout.signature()
    }

    /// `MZ` image with a `PE\0\0` signature.
    pub fn is_pe(&self) -> bool {
        self.dos.e_magic() == DOS_SIGNATURE && self.signature() == PE_SIGNATURE
    }

    pub fn is_ne(&self) -> bool {
        self.signature() == NE_SIGNATURE
    }

    pub fn is_dll(&self) -> bool {
        self.coff.characteristics().contains(FileCharacteristics::DLL)
    }

    pub fn is_64bit(&self) -> bool {
        self.optional.is_64bit()
    }

    pub fn coff_header(&self) -> CoffHeader<'a> {
        self.coff
    }

    pub fn optional_header(&self) -> OptionalHeader<'a> {
        self.optional
    }

    pub fn machine(&self) -> u16 {
        self.coff.machine()
    }

    /// `AddressOfEntryPoint` recorded at parse time.
    pub fn entry_point(&self) -> u32 {
        self.layout.entry_point()
    }

    /// `ImageBase` recorded at parse time, widened for PE32.
    pub fn image_base(&self) -> u64 {
        self.layout.image_base()
    }

    pub fn directories_count(&self) -> usize {
        self.directories.len()
    }

    pub fn directories(&self) -> &[DataDirectory<'a>] {
        &self.directories
    }

    /// Directory entry by well-known index, `None` if the image declares
    /// fewer directories.
    pub fn directory(&self, entry: DirectoryEntry) -> Option<DataDirectory<'a>> {
        self.directories.get(entry.index()).copied()
    }

    pub fn sections_count(&self) -> usize {
        self.sections.len()
    }

    pub fn sections(&self) -> &SectionTable<'a> {
        &self.sections
    }

    pub fn section_by_name(&self, name: &str) -> Option<SectionHeader<'a>> {
        self.sections.section_by_name(name)
    }

    pub fn section_for_rva(&self, rva: u64) -> Option<SectionHeader<'a>> {
        self.sections.section_for_rva(rva)
    }

    pub fn rva_to_offset(&self, rva: u64) -> u64 {
        self.sections.rva_to_offset(rva)
    }

    pub fn offset_to_rva(&self, offset: u64) -> u64 {
        self.sections.offset_to_rva(offset)
    }

    pub fn section_data(&self, section: &SectionHeader<'_>) -> &'a [u8] {
        self.sections.section_data(section)
    }

    /// Section holding the entry point, if any.
    pub fn entry_section(&self) -> Option<SectionHeader<'a>> {
        self.section_for_rva(u64::from(self.entry_point()))
    }
}

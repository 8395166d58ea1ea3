//! PE header parsing
//!
//! Walks the mapped bytes in structural order (DOS header, NT signature,
//! COFF header, optional header, data directories, section table) and
//! records the offset of every validated structure. Nothing is copied; the
//! resulting [`Layout`] is an index into the region that views are later
//! bound to.

use tracing::{debug, trace, warn};

use crate::error::{PeError, Result};
use crate::formats::pe::types::*;
use crate::formats::pe::utils::Region;

/// Validated structural index of a PE image.
///
/// Every stored offset passed the bounds checker when the layout was built.
/// Offsets stay meaningful for as long as the region they were computed
/// against keeps its length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    signature: u32,
    signature_offset: usize,
    coff_offset: usize,
    optional_offset: usize,
    optional_kind: OptionalHeaderKind,
    entry_point: u32,
    image_base: u64,
    directories: Vec<usize>,
    sections: Vec<usize>,
}

impl Layout {
    /// Validate and index the structural skeleton of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let region = Region::new(data);
        let _span = tracing::trace_span!("overlay_parse", size = region.len()).entered();

        if region.read_u16(0) != Some(DOS_SIGNATURE) {
            return Err(PeError::NotAPeFile);
        }

        // e_lfanew is the last field of the DOS header, so the header is
        // readable exactly when the field is.
        let dos = region
            .overlay::<DOS_HEADER_SIZE>(0)
            .map(DosHeader::new)
            .ok_or(PeError::InvalidLfanew { lfanew: 0 })?;

        let lfanew = dos.e_lfanew();
        let signature_offset = lfanew as usize;
        let signature = region
            .read_u32(signature_offset)
            .ok_or(PeError::InvalidLfanew { lfanew })?;
        match signature {
            PE_SIGNATURE | NE_SIGNATURE => {}
            other => return Err(PeError::InvalidSignature { signature: other }),
        }
        trace!(offset = signature_offset, signature, "NT signature accepted");

        let coff_offset = signature_offset + SIGNATURE_SIZE;
        let coff = region
            .overlay::<COFF_HEADER_SIZE>(coff_offset)
            .map(CoffHeader::new)
            .ok_or(PeError::MissingCoffHeader {
                offset: coff_offset,
            })?;
        let num_sections = coff.number_of_sections();

        let optional_offset = coff_offset + COFF_HEADER_SIZE;
        let magic = region
            .read_u16(optional_offset)
            .ok_or(PeError::MissingOptionalHeader {
                offset: optional_offset,
            })?;
        let optional_kind = match OptionalHeaderKind::from_magic(magic) {
            Some(kind) => kind,
            None => {
                debug!(magic, rom = magic == ROM_MAGIC, "unsupported optional header");
                return Err(PeError::UnsupportedImage { magic });
            }
        };
        let optional = overlay_optional(&region, optional_offset, optional_kind).ok_or(
            PeError::MissingOptionalHeader {
                offset: optional_offset,
            },
        )?;
        trace!(kind = %optional_kind, offset = optional_offset, "optional header overlaid");

        let num_directories = optional.number_of_rva_and_sizes();
        if num_directories > MAX_DIRECTORIES {
            warn!(count = num_directories, limit = MAX_DIRECTORIES, "too many directories");
            return Err(PeError::TooManyDirectories {
                count: num_directories,
                limit: MAX_DIRECTORIES,
            });
        }
        if num_sections > MAX_SECTIONS {
            warn!(count = num_sections, limit = MAX_SECTIONS, "too many sections");
            return Err(PeError::TooManySections {
                count: num_sections,
                limit: MAX_SECTIONS,
            });
        }

        // Directories follow the concrete layout, sections follow the declared
        // SizeOfOptionalHeader. The two may legitimately disagree.
        let directories_base = optional_offset + optional_kind.length();
        let directories = index_table(
            &region,
            directories_base,
            num_directories as usize,
            DATA_DIRECTORY_SIZE,
            "directory",
        )
        .map_err(|fault| match fault {
            TableFault::Alloc(e) => e,
            TableFault::Truncated { valid } => PeError::TruncatedDirectoryTable {
                offset: directories_base,
                valid,
                count: num_directories as usize,
            },
        })?;

        let sections_base = signature_offset
            + SIGNATURE_SIZE
            + COFF_HEADER_SIZE
            + coff.size_of_optional_header() as usize;
        let sections = index_table(
            &region,
            sections_base,
            num_sections as usize,
            SECTION_HEADER_SIZE,
            "section",
        )
        .map_err(|fault| match fault {
            TableFault::Alloc(e) => e,
            TableFault::Truncated { valid } => PeError::TruncatedSectionTable {
                offset: sections_base,
                valid,
                count: num_sections as usize,
            },
        })?;

        debug!(
            kind = %optional_kind,
            directories = directories.len(),
            sections = sections.len(),
            entry_point = optional.entry_point(),
            image_base = optional.image_base(),
            "parsed PE layout"
        );

        Ok(Self {
            signature,
            signature_offset,
            coff_offset,
            optional_offset,
            optional_kind,
            entry_point: optional.entry_point(),
            image_base: optional.image_base(),
            directories,
            sections,
        })
    }

    pub fn signature(&self) -> u32 {
        self.signature
    }

    pub fn signature_offset(&self) -> usize {
        self.signature_offset
    }

    pub fn coff_offset(&self) -> usize {
        self.coff_offset
    }

    pub fn optional_offset(&self) -> usize {
        self.optional_offset
    }

    pub fn optional_kind(&self) -> OptionalHeaderKind {
        self.optional_kind
    }

    pub fn entry_point(&self) -> u32 {
        self.entry_point
    }

    pub fn image_base(&self) -> u64 {
        self.image_base
    }

    /// Offset of the directory table, `None` when the image declares none.
    pub fn directories_base(&self) -> Option<usize> {
        self.directories.first().copied()
    }

    /// Offset of the section table, `None` when the image declares none.
    pub fn sections_base(&self) -> Option<usize> {
        self.sections.first().copied()
    }

    pub fn directory_offsets(&self) -> &[usize] {
        &self.directories
    }

    pub fn section_offsets(&self) -> &[usize] {
        &self.sections
    }
}

pub(crate) fn overlay_optional<'a>(
    region: &Region<'a>,
    offset: usize,
    kind: OptionalHeaderKind,
) -> Option<OptionalHeader<'a>> {
    match kind {
        OptionalHeaderKind::Pe32 => region
            .overlay::<OPTIONAL_HEADER32_SIZE>(offset)
            .map(OptionalHeader::pe32),
        OptionalHeaderKind::Pe32Plus => region
            .overlay::<OPTIONAL_HEADER64_SIZE>(offset)
            .map(OptionalHeader::pe32plus),
    }
}

enum TableFault {
    Alloc(PeError),
    Truncated { valid: usize },
}

/// Offsets of `count` consecutive entries at `base`, each bounds-checked.
fn index_table(
    region: &Region<'_>,
    base: usize,
    count: usize,
    entry_size: usize,
    what: &'static str,
) -> std::result::Result<Vec<usize>, TableFault> {
    let mut offsets = Vec::new();
    offsets
        .try_reserve_exact(count)
        .map_err(|_| TableFault::Alloc(PeError::AllocationFailure { what, count }))?;

    for i in 0..count {
        let offset = base.checked_add(i * entry_size);
        match offset {
            Some(offset) if region.can_read(offset, entry_size) => offsets.push(offset),
            _ => {
                warn!(table = what, base, index = i, count, "table runs past the mapped region");
                return Err(TableFault::Truncated { valid: i });
            }
        }
    }

    Ok(offsets)
}

//! Shared helpers for integration tests.
//!
//! `PeImage` assembles small PE files byte by byte so tests do not depend on
//! sample binaries being checked out; `create_temp_file` puts them on disk so
//! they go through the real mmap path.

#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub const LFANEW: usize = 0x40;
pub const COFF: usize = LFANEW + 4;
pub const OPTIONAL: usize = COFF + 20;

/// Creates a temporary file holding `content`.
///
/// The file is removed when the returned handle is dropped.
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub name: &'static str,
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub pointer_to_raw_data: u32,
    pub size_of_raw_data: u32,
    pub characteristics: u32,
}

/// Minimal PE image description.
#[derive(Debug, Clone)]
pub struct PeImage {
    pub pe32plus: bool,
    pub machine: u16,
    pub characteristics: u16,
    pub entry_point: u32,
    pub image_base: u64,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub directories: Vec<(u32, u32)>,
    pub sections: Vec<SectionSpec>,
}

impl PeImage {
    /// A 32-bit console executable with `.text` and `.data`.
    pub fn pe32() -> Self {
        Self {
            pe32plus: false,
            machine: 0x014c,
            characteristics: 0x0102,
            entry_point: 0x1010,
            image_base: 0x0040_0000,
            subsystem: 3,
            dll_characteristics: 0x0140,
            directories: vec![(0, 0), (0x2000, 0x3C), (0, 0), (0, 0)]
                .into_iter()
                .chain(std::iter::repeat((0, 0)).take(12))
                .collect(),
            sections: vec![
                SectionSpec {
                    name: ".text",
                    virtual_address: 0x1000,
                    virtual_size: 0x0F00,
                    pointer_to_raw_data: 0x400,
                    size_of_raw_data: 0x1000,
                    characteristics: 0x6000_0020,
                },
                SectionSpec {
                    name: ".data",
                    virtual_address: 0x2000,
                    virtual_size: 0x0200,
                    pointer_to_raw_data: 0x1400,
                    size_of_raw_data: 0x200,
                    characteristics: 0xC000_0040,
                },
            ],
        }
    }

    /// A 64-bit DLL with one section.
    pub fn pe32plus_dll() -> Self {
        Self {
            pe32plus: true,
            machine: 0x8664,
            characteristics: 0x2022,
            entry_point: 0x1000,
            image_base: 0x1_8000_0000,
            subsystem: 2,
            dll_characteristics: 0x8160,
            directories: vec![(0x1100, 0x80); 16],
            sections: vec![SectionSpec {
                name: ".text",
                virtual_address: 0x1000,
                virtual_size: 0x200,
                pointer_to_raw_data: 0x200,
                size_of_raw_data: 0x200,
                characteristics: 0x6000_0020,
            }],
        }
    }

    pub fn optional_size(&self) -> usize {
        if self.pe32plus {
            112
        } else {
            96
        }
    }

    /// Offset of the first section header.
    pub fn section_table_offset(&self) -> usize {
        OPTIONAL + self.optional_size() + self.directories.len() * 8
    }

    pub fn build(&self) -> Vec<u8> {
        let headers_end = self.section_table_offset() + self.sections.len() * 40;
        let data_end = self
            .sections
            .iter()
            .map(|s| (s.pointer_to_raw_data + s.size_of_raw_data) as usize)
            .max()
            .unwrap_or(0);
        let mut out = vec![0u8; headers_end.max(data_end)];

        put(&mut out, 0, b"MZ");
        put(&mut out, 60, &(LFANEW as u32).to_le_bytes());
        put(&mut out, LFANEW, b"PE\0\0");

        put(&mut out, COFF, &self.machine.to_le_bytes());
        put(&mut out, COFF + 2, &(self.sections.len() as u16).to_le_bytes());
        let size_of_optional = (self.optional_size() + self.directories.len() * 8) as u16;
        put(&mut out, COFF + 16, &size_of_optional.to_le_bytes());
        put(&mut out, COFF + 18, &self.characteristics.to_le_bytes());

        let magic: u16 = if self.pe32plus { 0x20b } else { 0x10b };
        put(&mut out, OPTIONAL, &magic.to_le_bytes());
        put(&mut out, OPTIONAL + 16, &self.entry_point.to_le_bytes());
        if self.pe32plus {
            put(&mut out, OPTIONAL + 24, &self.image_base.to_le_bytes());
        } else {
            put(&mut out, OPTIONAL + 28, &(self.image_base as u32).to_le_bytes());
        }
        put(&mut out, OPTIONAL + 32, &0x1000u32.to_le_bytes());
        put(&mut out, OPTIONAL + 36, &0x200u32.to_le_bytes());
        put(&mut out, OPTIONAL + 68, &self.subsystem.to_le_bytes());
        put(&mut out, OPTIONAL + 70, &self.dll_characteristics.to_le_bytes());
        let count_at = OPTIONAL + self.optional_size() - 4;
        put(&mut out, count_at, &(self.directories.len() as u32).to_le_bytes());

        let dirs = OPTIONAL + self.optional_size();
        for (i, (rva, size)) in self.directories.iter().enumerate() {
            put(&mut out, dirs + i * 8, &rva.to_le_bytes());
            put(&mut out, dirs + i * 8 + 4, &size.to_le_bytes());
        }

        let table = self.section_table_offset();
        for (i, s) in self.sections.iter().enumerate() {
            let at = table + i * 40;
            put(&mut out, at, s.name.as_bytes());
            put(&mut out, at + 8, &s.virtual_size.to_le_bytes());
            put(&mut out, at + 12, &s.virtual_address.to_le_bytes());
            put(&mut out, at + 16, &s.size_of_raw_data.to_le_bytes());
            put(&mut out, at + 20, &s.pointer_to_raw_data.to_le_bytes());
            put(&mut out, at + 36, &s.characteristics.to_le_bytes());
        }

        out
    }
}

pub fn put(buf: &mut [u8], at: usize, bytes: &[u8]) {
    buf[at..at + bytes.len()].copy_from_slice(bytes);
}

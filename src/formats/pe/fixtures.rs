//! In-memory PE image builder for unit tests

use crate::formats::pe::types::*;

const LFANEW: usize = 0x80;

struct Section {
    name: Vec<u8>,
    virtual_address: u32,
    virtual_size: u32,
    pointer_to_raw_data: u32,
    size_of_raw_data: u32,
    characteristics: u32,
}

/// Builds minimal but well-formed images; setters override single fields
/// to produce malformed variants.
pub(crate) struct ImageBuilder {
    kind: OptionalHeaderKind,
    signature: u32,
    characteristics: u16,
    directories: u32,
    number_of_sections: Option<u16>,
    size_of_optional_header: Option<u16>,
    sections: Vec<Section>,
}

impl ImageBuilder {
    pub(crate) fn pe32() -> Self {
        Self::with_kind(OptionalHeaderKind::Pe32)
    }

    pub(crate) fn pe32plus() -> Self {
        Self::with_kind(OptionalHeaderKind::Pe32Plus)
    }

    fn with_kind(kind: OptionalHeaderKind) -> Self {
        Self {
            kind,
            signature: PE_SIGNATURE,
            characteristics: FileCharacteristics::EXECUTABLE_IMAGE.bits(),
            directories: MAX_DIRECTORIES,
            number_of_sections: None,
            size_of_optional_header: None,
            sections: Vec::new(),
        }
    }

    pub(crate) fn signature(mut self, signature: u32) -> Self {
        self.signature = signature;
        self
    }

    pub(crate) fn characteristics(mut self, characteristics: u16) -> Self {
        self.characteristics = characteristics;
        self
    }

    /// Declared `NumberOfRvaAndSizes`; at most 16 entries are written.
    pub(crate) fn directories(mut self, count: u32) -> Self {
        self.directories = count;
        self
    }

    /// Declared `NumberOfSections`, independent of the headers written.
    pub(crate) fn number_of_sections(mut self, count: u16) -> Self {
        self.number_of_sections = Some(count);
        self
    }

    pub(crate) fn size_of_optional_header(mut self, size: u16) -> Self {
        self.size_of_optional_header = Some(size);
        self
    }

    pub(crate) fn section(
        mut self,
        name: &str,
        virtual_address: u32,
        virtual_size: u32,
        pointer_to_raw_data: u32,
        size_of_raw_data: u32,
    ) -> Self {
        self.sections.push(Section {
            name: name.as_bytes().iter().copied().take(SECTION_NAME_SIZE).collect(),
            virtual_address,
            virtual_size,
            pointer_to_raw_data,
            size_of_raw_data,
            characteristics: 0x6000_0020,
        });
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let written_dirs = self.directories.min(MAX_DIRECTORIES) as usize;
        let optional_offset = LFANEW + SIGNATURE_SIZE + COFF_HEADER_SIZE;
        let size_of_optional_header = self
            .size_of_optional_header
            .map(usize::from)
            .unwrap_or(self.kind.length() + written_dirs * DATA_DIRECTORY_SIZE);
        let sections_offset = optional_offset + size_of_optional_header;
        let headers_end = (sections_offset + self.sections.len() * SECTION_HEADER_SIZE)
            .max(optional_offset + self.kind.length() + written_dirs * DATA_DIRECTORY_SIZE);
        let raw_end = self
            .sections
            .iter()
            .map(|s| (s.pointer_to_raw_data + s.size_of_raw_data) as usize)
            .max()
            .unwrap_or(0);
        let mut out = vec![0u8; headers_end.max(raw_end)];

        // DOS header
        out[0..2].copy_from_slice(&DOS_SIGNATURE.to_le_bytes());
        out[E_LFANEW_OFFSET..E_LFANEW_OFFSET + 4].copy_from_slice(&(LFANEW as u32).to_le_bytes());

        // Signature + COFF
        out[LFANEW..LFANEW + 4].copy_from_slice(&self.signature.to_le_bytes());
        let coff = LFANEW + SIGNATURE_SIZE;
        out[coff..coff + 2].copy_from_slice(&IMAGE_FILE_MACHINE_I386.to_le_bytes());
        let nsections = self
            .number_of_sections
            .unwrap_or(self.sections.len() as u16);
        out[coff + 2..coff + 4].copy_from_slice(&nsections.to_le_bytes());
        out[coff + 4..coff + 8].copy_from_slice(&0x5F5E_1000u32.to_le_bytes());
        out[coff + 16..coff + 18]
            .copy_from_slice(&(size_of_optional_header as u16).to_le_bytes());
        out[coff + 18..coff + 20].copy_from_slice(&self.characteristics.to_le_bytes());

        // Optional header
        let opt = optional_offset;
        out[opt..opt + 2].copy_from_slice(&self.kind.magic().to_le_bytes());
        match self.kind {
            OptionalHeaderKind::Pe32 => {
                out[opt + 16..opt + 20].copy_from_slice(&0x1000u32.to_le_bytes());
                out[opt + 28..opt + 32].copy_from_slice(&0x0040_0000u32.to_le_bytes());
                out[opt + 92..opt + 96].copy_from_slice(&self.directories.to_le_bytes());
            }
            OptionalHeaderKind::Pe32Plus => {
                out[opt + 16..opt + 20].copy_from_slice(&0x2000u32.to_le_bytes());
                out[opt + 24..opt + 32].copy_from_slice(&0x1_4000_0000u64.to_le_bytes());
                out[opt + 108..opt + 112].copy_from_slice(&self.directories.to_le_bytes());
            }
        }
        out[opt + 32..opt + 36].copy_from_slice(&0x1000u32.to_le_bytes());
        out[opt + 36..opt + 40].copy_from_slice(&0x200u32.to_le_bytes());
        out[opt + 68..opt + 70].copy_from_slice(&IMAGE_SUBSYSTEM_WINDOWS_CUI.to_le_bytes());

        // Directory entries: import table points somewhere recognizable
        let dirs = opt + self.kind.length();
        if written_dirs > DirectoryEntry::Import.index() {
            let at = dirs + DirectoryEntry::Import.index() * DATA_DIRECTORY_SIZE;
            out[at..at + 4].copy_from_slice(&0x2000u32.to_le_bytes());
            out[at + 4..at + 8].copy_from_slice(&0x28u32.to_le_bytes());
        }

        for (i, s) in self.sections.iter().enumerate() {
            let at = sections_offset + i * SECTION_HEADER_SIZE;
            out[at..at + s.name.len()].copy_from_slice(&s.name);
            out[at + 8..at + 12].copy_from_slice(&s.virtual_size.to_le_bytes());
            out[at + 12..at + 16].copy_from_slice(&s.virtual_address.to_le_bytes());
            out[at + 16..at + 20].copy_from_slice(&s.size_of_raw_data.to_le_bytes());
            out[at + 20..at + 24].copy_from_slice(&s.pointer_to_raw_data.to_le_bytes());
            out[at + 36..at + 40].copy_from_slice(&s.characteristics.to_le_bytes());

            let start = s.pointer_to_raw_data as usize;
            let end = start + s.size_of_raw_data as usize;
            if start >= headers_end {
                out[start..end].fill(i as u8 + 1);
            }
        }

        out
    }
}

//! Core PE constants and zero-copy header views
//!
//! Each view wraps a fixed-size array borrowed straight out of the mapped
//! region. The array is obtained through the bounds checker, so field
//! accessors read at constant offsets that are always in range.

use bitflags::bitflags;
use std::borrow::Cow;
use std::fmt;

use super::utils::{field_u16, field_u32, field_u64};

// PE constants
pub const DOS_SIGNATURE: u16 = 0x5A4D; // MZ
pub const PE_SIGNATURE: u32 = 0x0000_4550; // PE\0\0
pub const NE_SIGNATURE: u32 = 0x0000_454E; // NE\0\0
pub const ROM_MAGIC: u16 = 0x107;
pub const PE32_MAGIC: u16 = 0x10B;
pub const PE32PLUS_MAGIC: u16 = 0x20B;

// Structure sizes
pub const DOS_HEADER_SIZE: usize = 64;
pub const E_LFANEW_OFFSET: usize = 60;
pub const SIGNATURE_SIZE: usize = 4;
pub const COFF_HEADER_SIZE: usize = 20;
pub const OPTIONAL_HEADER32_SIZE: usize = 96;
pub const OPTIONAL_HEADER64_SIZE: usize = 112;
pub const DATA_DIRECTORY_SIZE: usize = 8;
pub const SECTION_HEADER_SIZE: usize = 40;
pub const SECTION_NAME_SIZE: usize = 8;

/// Upper bound on `NumberOfRvaAndSizes` accepted by the parser.
pub const MAX_DIRECTORIES: u32 = 16;
/// Upper bound on `NumberOfSections` accepted by the parser.
pub const MAX_SECTIONS: u16 = 96;

// Machine types
pub const IMAGE_FILE_MACHINE_UNKNOWN: u16 = 0x0000;
pub const IMAGE_FILE_MACHINE_ALPHA: u16 = 0x0184;
pub const IMAGE_FILE_MACHINE_ALPHA64: u16 = 0x0284;
pub const IMAGE_FILE_MACHINE_AM33: u16 = 0x01d3;
pub const IMAGE_FILE_MACHINE_AMD64: u16 = 0x8664;
pub const IMAGE_FILE_MACHINE_ARM: u16 = 0x01c0;
pub const IMAGE_FILE_MACHINE_ARMV7: u16 = 0x01c4;
pub const IMAGE_FILE_MACHINE_ARM64: u16 = 0xaa64;
pub const IMAGE_FILE_MACHINE_CEE: u16 = 0xc0ee;
pub const IMAGE_FILE_MACHINE_CEF: u16 = 0x0cef;
pub const IMAGE_FILE_MACHINE_EBC: u16 = 0x0ebc;
pub const IMAGE_FILE_MACHINE_I386: u16 = 0x014c;
pub const IMAGE_FILE_MACHINE_I860: u16 = 0x014d;
pub const IMAGE_FILE_MACHINE_IA64: u16 = 0x0200;
pub const IMAGE_FILE_MACHINE_M32R: u16 = 0x9041;
pub const IMAGE_FILE_MACHINE_M68K: u16 = 0x0268;
pub const IMAGE_FILE_MACHINE_MIPS16: u16 = 0x0266;
pub const IMAGE_FILE_MACHINE_MIPSFPU: u16 = 0x0366;
pub const IMAGE_FILE_MACHINE_MIPSFPU16: u16 = 0x0466;
pub const IMAGE_FILE_MACHINE_MPPC_601: u16 = 0x0601;
pub const IMAGE_FILE_MACHINE_PARISC: u16 = 0x0290;
pub const IMAGE_FILE_MACHINE_POWERPC: u16 = 0x01f0;
pub const IMAGE_FILE_MACHINE_POWERPCFP: u16 = 0x01f1;
pub const IMAGE_FILE_MACHINE_R3000: u16 = 0x0162;
pub const IMAGE_FILE_MACHINE_R3000_BE: u16 = 0x0160;
pub const IMAGE_FILE_MACHINE_R4000: u16 = 0x0166;
pub const IMAGE_FILE_MACHINE_R10000: u16 = 0x0168;
pub const IMAGE_FILE_MACHINE_SH3: u16 = 0x01a2;
pub const IMAGE_FILE_MACHINE_SH3DSP: u16 = 0x01a3;
pub const IMAGE_FILE_MACHINE_SH3E: u16 = 0x01a4;
pub const IMAGE_FILE_MACHINE_SH4: u16 = 0x01a6;
pub const IMAGE_FILE_MACHINE_SH5: u16 = 0x01a8;
pub const IMAGE_FILE_MACHINE_TRICORE: u16 = 0x0520;
pub const IMAGE_FILE_MACHINE_THUMB: u16 = 0x01c2;
pub const IMAGE_FILE_MACHINE_WCEMIPSV2: u16 = 0x0169;

// Subsystems
pub const IMAGE_SUBSYSTEM_UNKNOWN: u16 = 0;
pub const IMAGE_SUBSYSTEM_NATIVE: u16 = 1;
pub const IMAGE_SUBSYSTEM_WINDOWS_GUI: u16 = 2;
pub const IMAGE_SUBSYSTEM_WINDOWS_CUI: u16 = 3;
pub const IMAGE_SUBSYSTEM_OS2_CUI: u16 = 5;
pub const IMAGE_SUBSYSTEM_POSIX_CUI: u16 = 7;
pub const IMAGE_SUBSYSTEM_WINDOWS_CE_GUI: u16 = 9;
pub const IMAGE_SUBSYSTEM_EFI_APPLICATION: u16 = 10;
pub const IMAGE_SUBSYSTEM_EFI_BOOT_SERVICE_DRIVER: u16 = 11;
pub const IMAGE_SUBSYSTEM_EFI_RUNTIME_DRIVER: u16 = 12;
pub const IMAGE_SUBSYSTEM_EFI_ROM: u16 = 13;
pub const IMAGE_SUBSYSTEM_XBOX: u16 = 14;
pub const IMAGE_SUBSYSTEM_WINDOWS_BOOT_APPLICATION: u16 = 16;

/// Section alignment is a 4-bit field, not a flag.
pub const IMAGE_SCN_ALIGN_MASK: u32 = 0x00F0_0000;

bitflags! {
    /// COFF header `Characteristics`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileCharacteristics: u16 {
        const RELOCS_STRIPPED = 0x0001;
        const EXECUTABLE_IMAGE = 0x0002;
        const LINE_NUMS_STRIPPED = 0x0004;
        const LOCAL_SYMS_STRIPPED = 0x0008;
        const AGGRESSIVE_WS_TRIM = 0x0010;
        const LARGE_ADDRESS_AWARE = 0x0020;
        const RESERVED = 0x0040;
        const BYTES_REVERSED_LO = 0x0080;
        const MACHINE_32BIT = 0x0100;
        const DEBUG_STRIPPED = 0x0200;
        const REMOVABLE_RUN_FROM_SWAP = 0x0400;
        const NET_RUN_FROM_SWAP = 0x0800;
        const SYSTEM = 0x1000;
        const DLL = 0x2000;
        const UP_SYSTEM_ONLY = 0x4000;
        const BYTES_REVERSED_HI = 0x8000;
    }
}

bitflags! {
    /// Optional header `DllCharacteristics`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DllCharacteristics: u16 {
        const HIGH_ENTROPY_VA = 0x0020;
        const DYNAMIC_BASE = 0x0040;
        const FORCE_INTEGRITY = 0x0080;
        const NX_COMPAT = 0x0100;
        const NO_ISOLATION = 0x0200;
        const NO_SEH = 0x0400;
        const NO_BIND = 0x0800;
        const APPCONTAINER = 0x1000;
        const WDM_DRIVER = 0x2000;
        const GUARD_CF = 0x4000;
        const TERMINAL_SERVER_AWARE = 0x8000;
    }
}

bitflags! {
    /// Section header `Characteristics`, excluding the alignment field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SectionCharacteristics: u32 {
        const TYPE_NO_PAD = 0x0000_0008;
        const CNT_CODE = 0x0000_0020;
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        const LNK_OTHER = 0x0000_0100;
        const LNK_INFO = 0x0000_0200;
        const LNK_REMOVE = 0x0000_0800;
        const LNK_COMDAT = 0x0000_1000;
        const NO_DEFER_SPEC_EXC = 0x0000_4000;
        const GPREL = 0x0000_8000;
        const MEM_PURGEABLE = 0x0002_0000;
        const MEM_LOCKED = 0x0004_0000;
        const MEM_PRELOAD = 0x0008_0000;
        const LNK_NRELOC_OVFL = 0x0100_0000;
        const MEM_DISCARDABLE = 0x0200_0000;
        const MEM_NOT_CACHED = 0x0400_0000;
        const MEM_NOT_PAGED = 0x0800_0000;
        const MEM_SHARED = 0x1000_0000;
        const MEM_EXECUTE = 0x2000_0000;
        const MEM_READ = 0x4000_0000;
        const MEM_WRITE = 0x8000_0000;
    }
}

/// Data directory slots, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum DirectoryEntry {
    Export = 0,
    Import = 1,
    Resource = 2,
    Exception = 3,
    Security = 4,
    BaseReloc = 5,
    Debug = 6,
    Architecture = 7,
    GlobalPtr = 8,
    Tls = 9,
    LoadConfig = 10,
    BoundImport = 11,
    Iat = 12,
    DelayImport = 13,
    ComDescriptor = 14,
    Reserved = 15,
}

impl DirectoryEntry {
    pub const ALL: [DirectoryEntry; 16] = [
        Self::Export,
        Self::Import,
        Self::Resource,
        Self::Exception,
        Self::Security,
        Self::BaseReloc,
        Self::Debug,
        Self::Architecture,
        Self::GlobalPtr,
        Self::Tls,
        Self::LoadConfig,
        Self::BoundImport,
        Self::Iat,
        Self::DelayImport,
        Self::ComDescriptor,
        Self::Reserved,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Which optional header layout the image uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionalHeaderKind {
    Pe32,
    Pe32Plus,
}

impl OptionalHeaderKind {
    pub fn from_magic(magic: u16) -> Option<Self> {
        match magic {
            PE32_MAGIC => Some(Self::Pe32),
            PE32PLUS_MAGIC => Some(Self::Pe32Plus),
            _ => None,
        }
    }

    pub fn magic(self) -> u16 {
        match self {
            Self::Pe32 => PE32_MAGIC,
            Self::Pe32Plus => PE32PLUS_MAGIC,
        }
    }

    /// Concrete size of the fixed part of the header, directories excluded.
    pub fn length(self) -> usize {
        match self {
            Self::Pe32 => OPTIONAL_HEADER32_SIZE,
            Self::Pe32Plus => OPTIONAL_HEADER64_SIZE,
        }
    }
}

impl fmt::Display for OptionalHeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pe32 => write!(f, "PE32"),
            Self::Pe32Plus => write!(f, "PE32+"),
        }
    }
}

/// DOS header (64 bytes)
#[derive(Debug, Clone, Copy)]
pub struct DosHeader<'a> {
    raw: &'a [u8; DOS_HEADER_SIZE],
}

impl<'a> DosHeader<'a> {
    pub(crate) fn new(raw: &'a [u8; DOS_HEADER_SIZE]) -> Self {
        Self { raw }
    }

    pub fn e_magic(&self) -> u16 {
        field_u16(self.raw, 0)
    }

    /// Bytes on last page of file
    pub fn e_cblp(&self) -> u16 {
        field_u16(self.raw, 2)
    }

    /// Pages in file
    pub fn e_cp(&self) -> u16 {
        field_u16(self.raw, 4)
    }

    /// Size of header in paragraphs
    pub fn e_cparhdr(&self) -> u16 {
        field_u16(self.raw, 8)
    }

    /// File address of the NT signature
    pub fn e_lfanew(&self) -> u32 {
        field_u32(self.raw, E_LFANEW_OFFSET)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }
}

/// COFF file header (20 bytes)
#[derive(Debug, Clone, Copy)]
pub struct CoffHeader<'a> {
    raw: &'a [u8; COFF_HEADER_SIZE],
}

impl<'a> CoffHeader<'a> {
    pub(crate) fn new(raw: &'a [u8; COFF_HEADER_SIZE]) -> Self {
        Self { raw }
    }

    pub fn machine(&self) -> u16 {
        field_u16(self.raw, 0)
    }

    pub fn number_of_sections(&self) -> u16 {
        field_u16(self.raw, 2)
    }

    pub fn time_date_stamp(&self) -> u32 {
        field_u32(self.raw, 4)
    }

    pub fn pointer_to_symbol_table(&self) -> u32 {
        field_u32(self.raw, 8)
    }

    pub fn number_of_symbols(&self) -> u32 {
        field_u32(self.raw, 12)
    }

    /// Declared size; may differ from the concrete layout size.
    pub fn size_of_optional_header(&self) -> u16 {
        field_u16(self.raw, 16)
    }

    pub fn characteristics_raw(&self) -> u16 {
        field_u16(self.raw, 18)
    }

    pub fn characteristics(&self) -> FileCharacteristics {
        FileCharacteristics::from_bits_retain(self.characteristics_raw())
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }
}

#[derive(Debug, Clone, Copy)]
enum OptionalLayout<'a> {
    Pe32(&'a [u8; OPTIONAL_HEADER32_SIZE]),
    Pe32Plus(&'a [u8; OPTIONAL_HEADER64_SIZE]),
}

/// Optional header, either PE32 or PE32+.
///
/// The two physical layouts are hidden behind one accessor surface; fields
/// that are 32-bit in PE32 are widened to `u64`.
#[derive(Debug, Clone, Copy)]
pub struct OptionalHeader<'a> {
    layout: OptionalLayout<'a>,
}

// Offsets shared by both layouts
const OPT_ADDRESS_OF_ENTRY_POINT: usize = 16;
const OPT_BASE_OF_CODE: usize = 20;
const OPT_SECTION_ALIGNMENT: usize = 32;
const OPT_FILE_ALIGNMENT: usize = 36;
const OPT_SIZE_OF_IMAGE: usize = 56;
const OPT_SIZE_OF_HEADERS: usize = 60;
const OPT_CHECKSUM: usize = 64;
const OPT_SUBSYSTEM: usize = 68;
const OPT_DLL_CHARACTERISTICS: usize = 70;

impl<'a> OptionalHeader<'a> {
    pub(crate) fn pe32(raw: &'a [u8; OPTIONAL_HEADER32_SIZE]) -> Self {
        Self {
            layout: OptionalLayout::Pe32(raw),
        }
    }

    pub(crate) fn pe32plus(raw: &'a [u8; OPTIONAL_HEADER64_SIZE]) -> Self {
        Self {
            layout: OptionalLayout::Pe32Plus(raw),
        }
    }

    pub fn kind(&self) -> OptionalHeaderKind {
        match self.layout {
            OptionalLayout::Pe32(_) => OptionalHeaderKind::Pe32,
            OptionalLayout::Pe32Plus(_) => OptionalHeaderKind::Pe32Plus,
        }
    }

    pub fn magic(&self) -> u16 {
        self.kind().magic()
    }

    /// Concrete length of the active layout.
    pub fn length(&self) -> usize {
        self.kind().length()
    }

    pub fn is_64bit(&self) -> bool {
        matches!(self.layout, OptionalLayout::Pe32Plus(_))
    }

    fn u16_at(&self, at: usize) -> u16 {
        match self.layout {
            OptionalLayout::Pe32(raw) => field_u16(raw, at),
            OptionalLayout::Pe32Plus(raw) => field_u16(raw, at),
        }
    }

    fn u32_at(&self, at: usize) -> u32 {
        match self.layout {
            OptionalLayout::Pe32(raw) => field_u32(raw, at),
            OptionalLayout::Pe32Plus(raw) => field_u32(raw, at),
        }
    }

    pub fn entry_point(&self) -> u32 {
        self.u32_at(OPT_ADDRESS_OF_ENTRY_POINT)
    }

    pub fn base_of_code(&self) -> u32 {
        self.u32_at(OPT_BASE_OF_CODE)
    }

    pub fn image_base(&self) -> u64 {
        match self.layout {
            OptionalLayout::Pe32(raw) => field_u32(raw, 28) as u64,
            OptionalLayout::Pe32Plus(raw) => field_u64(raw, 24),
        }
    }

    pub fn section_alignment(&self) -> u32 {
        self.u32_at(OPT_SECTION_ALIGNMENT)
    }

    pub fn file_alignment(&self) -> u32 {
        self.u32_at(OPT_FILE_ALIGNMENT)
    }

    pub fn size_of_image(&self) -> u32 {
        self.u32_at(OPT_SIZE_OF_IMAGE)
    }

    pub fn size_of_headers(&self) -> u32 {
        self.u32_at(OPT_SIZE_OF_HEADERS)
    }

    pub fn checksum(&self) -> u32 {
        self.u32_at(OPT_CHECKSUM)
    }

    pub fn subsystem(&self) -> u16 {
        self.u16_at(OPT_SUBSYSTEM)
    }

    pub fn dll_characteristics_raw(&self) -> u16 {
        self.u16_at(OPT_DLL_CHARACTERISTICS)
    }

    pub fn dll_characteristics(&self) -> DllCharacteristics {
        DllCharacteristics::from_bits_retain(self.dll_characteristics_raw())
    }

    pub fn size_of_stack_reserve(&self) -> u64 {
        match self.layout {
            OptionalLayout::Pe32(raw) => field_u32(raw, 72) as u64,
            OptionalLayout::Pe32Plus(raw) => field_u64(raw, 72),
        }
    }

    pub fn number_of_rva_and_sizes(&self) -> u32 {
        match self.layout {
            OptionalLayout::Pe32(raw) => field_u32(raw, 92),
            OptionalLayout::Pe32Plus(raw) => field_u32(raw, 108),
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        match self.layout {
            OptionalLayout::Pe32(raw) => raw,
            OptionalLayout::Pe32Plus(raw) => raw,
        }
    }
}

/// Data directory entry (8 bytes)
#[derive(Debug, Clone, Copy)]
pub struct DataDirectory<'a> {
    raw: &'a [u8; DATA_DIRECTORY_SIZE],
}

impl<'a> DataDirectory<'a> {
    pub(crate) fn new(raw: &'a [u8; DATA_DIRECTORY_SIZE]) -> Self {
        Self { raw }
    }

    pub fn virtual_address(&self) -> u32 {
        field_u32(self.raw, 0)
    }

    pub fn size(&self) -> u32 {
        field_u32(self.raw, 4)
    }

    pub fn is_present(&self) -> bool {
        self.virtual_address() != 0 && self.size() > 0
    }
}

/// Section header (40 bytes)
#[derive(Debug, Clone, Copy)]
pub struct SectionHeader<'a> {
    raw: &'a [u8; SECTION_HEADER_SIZE],
}

impl<'a> SectionHeader<'a> {
    pub(crate) fn new(raw: &'a [u8; SECTION_HEADER_SIZE]) -> Self {
        Self { raw }
    }

    /// The raw fixed-width name; not necessarily NUL-terminated.
    pub fn name_bytes(&self) -> [u8; SECTION_NAME_SIZE] {
        let mut name = [0u8; SECTION_NAME_SIZE];
        name.copy_from_slice(&self.raw[..SECTION_NAME_SIZE]);
        name
    }

    /// Name up to the first NUL, lossily decoded.
    pub fn name(&self) -> Cow<'a, str> {
        let raw: &'a [u8; SECTION_HEADER_SIZE] = self.raw;
        let name = &raw[..SECTION_NAME_SIZE];
        let end = name.iter().position(|&b| b == 0).unwrap_or(SECTION_NAME_SIZE);
        String::from_utf8_lossy(&name[..end])
    }

    pub fn virtual_size(&self) -> u32 {
        field_u32(self.raw, 8)
    }

    pub fn virtual_address(&self) -> u32 {
        field_u32(self.raw, 12)
    }

    pub fn size_of_raw_data(&self) -> u32 {
        field_u32(self.raw, 16)
    }

    pub fn pointer_to_raw_data(&self) -> u32 {
        field_u32(self.raw, 20)
    }

    pub fn pointer_to_relocations(&self) -> u32 {
        field_u32(self.raw, 24)
    }

    pub fn pointer_to_linenumbers(&self) -> u32 {
        field_u32(self.raw, 28)
    }

    pub fn number_of_relocations(&self) -> u16 {
        field_u16(self.raw, 32)
    }

    pub fn number_of_linenumbers(&self) -> u16 {
        field_u16(self.raw, 34)
    }

    pub fn characteristics_raw(&self) -> u32 {
        field_u32(self.raw, 36)
    }

    pub fn characteristics(&self) -> SectionCharacteristics {
        SectionCharacteristics::from_bits_truncate(self.characteristics_raw())
    }

    /// Alignment in bytes encoded in the `IMAGE_SCN_ALIGN_*` field.
    pub fn alignment(&self) -> Option<u32> {
        match (self.characteristics_raw() & IMAGE_SCN_ALIGN_MASK) >> 20 {
            0 | 15 => None,
            n => Some(1 << (n - 1)),
        }
    }

    pub fn is_executable(&self) -> bool {
        self.characteristics().contains(SectionCharacteristics::MEM_EXECUTE)
    }

    pub fn is_readable(&self) -> bool {
        self.characteristics().contains(SectionCharacteristics::MEM_READ)
    }

    pub fn is_writable(&self) -> bool {
        self.characteristics().contains(SectionCharacteristics::MEM_WRITE)
    }

    pub fn contains_code(&self) -> bool {
        self.characteristics().contains(SectionCharacteristics::CNT_CODE)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }
}

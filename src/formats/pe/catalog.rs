//! Name catalogs for PE header constants
//!
//! Each catalog is a static `(value, name)` table searched linearly. Unknown
//! values yield `None`; callers decide how to render them.

use crate::formats::pe::types::*;

static MACHINE_NAMES: &[(u16, &str)] = &[
    (IMAGE_FILE_MACHINE_UNKNOWN, "IMAGE_FILE_MACHINE_UNKNOWN"),
    (IMAGE_FILE_MACHINE_ALPHA, "IMAGE_FILE_MACHINE_ALPHA"),
    (IMAGE_FILE_MACHINE_ALPHA64, "IMAGE_FILE_MACHINE_ALPHA64"),
    (IMAGE_FILE_MACHINE_AM33, "IMAGE_FILE_MACHINE_AM33"),
    (IMAGE_FILE_MACHINE_AMD64, "IMAGE_FILE_MACHINE_AMD64"),
    (IMAGE_FILE_MACHINE_ARM, "IMAGE_FILE_MACHINE_ARM"),
    (IMAGE_FILE_MACHINE_ARMV7, "IMAGE_FILE_MACHINE_ARMV7"),
    (IMAGE_FILE_MACHINE_ARM64, "IMAGE_FILE_MACHINE_ARM64"),
    (IMAGE_FILE_MACHINE_CEE, "IMAGE_FILE_MACHINE_CEE"),
    (IMAGE_FILE_MACHINE_CEF, "IMAGE_FILE_MACHINE_CEF"),
    (IMAGE_FILE_MACHINE_EBC, "IMAGE_FILE_MACHINE_EBC"),
    (IMAGE_FILE_MACHINE_I386, "IMAGE_FILE_MACHINE_I386"),
    (IMAGE_FILE_MACHINE_I860, "IMAGE_FILE_MACHINE_I860"),
    (IMAGE_FILE_MACHINE_IA64, "IMAGE_FILE_MACHINE_IA64"),
    (IMAGE_FILE_MACHINE_M32R, "IMAGE_FILE_MACHINE_M32R"),
    (IMAGE_FILE_MACHINE_M68K, "IMAGE_FILE_MACHINE_M68K"),
    (IMAGE_FILE_MACHINE_MIPS16, "IMAGE_FILE_MACHINE_MIPS16"),
    (IMAGE_FILE_MACHINE_MIPSFPU, "IMAGE_FILE_MACHINE_MIPSFPU"),
    (IMAGE_FILE_MACHINE_MIPSFPU16, "IMAGE_FILE_MACHINE_MIPSFPU16"),
    (IMAGE_FILE_MACHINE_MPPC_601, "IMAGE_FILE_MACHINE_MPPC_601"),
    (IMAGE_FILE_MACHINE_PARISC, "IMAGE_FILE_MACHINE_PARISC"),
    (IMAGE_FILE_MACHINE_POWERPC, "IMAGE_FILE_MACHINE_POWERPC"),
    (IMAGE_FILE_MACHINE_POWERPCFP, "IMAGE_FILE_MACHINE_POWERPCFP"),
    (IMAGE_FILE_MACHINE_R3000, "IMAGE_FILE_MACHINE_R3000"),
    (IMAGE_FILE_MACHINE_R3000_BE, "IMAGE_FILE_MACHINE_R3000_BE"),
    (IMAGE_FILE_MACHINE_R4000, "IMAGE_FILE_MACHINE_R4000"),
    (IMAGE_FILE_MACHINE_R10000, "IMAGE_FILE_MACHINE_R10000"),
    (IMAGE_FILE_MACHINE_SH3, "IMAGE_FILE_MACHINE_SH3"),
    (IMAGE_FILE_MACHINE_SH3DSP, "IMAGE_FILE_MACHINE_SH3DSP"),
    (IMAGE_FILE_MACHINE_SH3E, "IMAGE_FILE_MACHINE_SH3E"),
    (IMAGE_FILE_MACHINE_SH4, "IMAGE_FILE_MACHINE_SH4"),
    (IMAGE_FILE_MACHINE_SH5, "IMAGE_FILE_MACHINE_SH5"),
    (IMAGE_FILE_MACHINE_TRICORE, "IMAGE_FILE_MACHINE_TRICORE"),
    (IMAGE_FILE_MACHINE_THUMB, "IMAGE_FILE_MACHINE_THUMB"),
    (IMAGE_FILE_MACHINE_WCEMIPSV2, "IMAGE_FILE_MACHINE_WCEMIPSV2"),
];

static FILE_CHARACTERISTIC_NAMES: &[(u16, &str)] = &[
    (FileCharacteristics::RELOCS_STRIPPED.bits(), "IMAGE_FILE_RELOCS_STRIPPED"),
    (FileCharacteristics::EXECUTABLE_IMAGE.bits(), "IMAGE_FILE_EXECUTABLE_IMAGE"),
    (FileCharacteristics::LINE_NUMS_STRIPPED.bits(), "IMAGE_FILE_LINE_NUMS_STRIPPED"),
    (FileCharacteristics::LOCAL_SYMS_STRIPPED.bits(), "IMAGE_FILE_LOCAL_SYMS_STRIPPED"),
    (FileCharacteristics::AGGRESSIVE_WS_TRIM.bits(), "IMAGE_FILE_AGGRESSIVE_WS_TRIM"),
    (FileCharacteristics::LARGE_ADDRESS_AWARE.bits(), "IMAGE_FILE_LARGE_ADDRESS_AWARE"),
    (FileCharacteristics::RESERVED.bits(), "IMAGE_FILE_RESERVED"),
    (FileCharacteristics::BYTES_REVERSED_LO.bits(), "IMAGE_FILE_BYTES_REVERSED_LO"),
    (FileCharacteristics::MACHINE_32BIT.bits(), "IMAGE_FILE_32BIT_MACHINE"),
    (FileCharacteristics::DEBUG_STRIPPED.bits(), "IMAGE_FILE_DEBUG_STRIPPED"),
    (FileCharacteristics::REMOVABLE_RUN_FROM_SWAP.bits(), "IMAGE_FILE_REMOVABLE_RUN_FROM_SWAP"),
    (FileCharacteristics::NET_RUN_FROM_SWAP.bits(), "IMAGE_FILE_NET_RUN_FROM_SWAP"),
    (FileCharacteristics::SYSTEM.bits(), "IMAGE_FILE_SYSTEM"),
    (FileCharacteristics::DLL.bits(), "IMAGE_FILE_DLL"),
    (FileCharacteristics::UP_SYSTEM_ONLY.bits(), "IMAGE_FILE_UP_SYSTEM_ONLY"),
    (FileCharacteristics::BYTES_REVERSED_HI.bits(), "IMAGE_FILE_BYTES_REVERSED_HI"),
];

static DLL_CHARACTERISTIC_NAMES: &[(u16, &str)] = &[
    (DllCharacteristics::HIGH_ENTROPY_VA.bits(), "IMAGE_DLLCHARACTERISTICS_HIGH_ENTROPY_VA"),
    (DllCharacteristics::DYNAMIC_BASE.bits(), "IMAGE_DLLCHARACTERISTICS_DYNAMIC_BASE"),
    (DllCharacteristics::FORCE_INTEGRITY.bits(), "IMAGE_DLLCHARACTERISTICS_FORCE_INTEGRITY"),
    (DllCharacteristics::NX_COMPAT.bits(), "IMAGE_DLLCHARACTERISTICS_NX_COMPAT"),
    (DllCharacteristics::NO_ISOLATION.bits(), "IMAGE_DLLCHARACTERISTICS_NO_ISOLATION"),
    (DllCharacteristics::NO_SEH.bits(), "IMAGE_DLLCHARACTERISTICS_NO_SEH"),
    (DllCharacteristics::NO_BIND.bits(), "IMAGE_DLLCHARACTERISTICS_NO_BIND"),
    (DllCharacteristics::APPCONTAINER.bits(), "IMAGE_DLLCHARACTERISTICS_APPCONTAINER"),
    (DllCharacteristics::WDM_DRIVER.bits(), "IMAGE_DLLCHARACTERISTICS_WDM_DRIVER"),
    (DllCharacteristics::GUARD_CF.bits(), "IMAGE_DLLCHARACTERISTICS_GUARD_CF"),
    (
        DllCharacteristics::TERMINAL_SERVER_AWARE.bits(),
        "IMAGE_DLLCHARACTERISTICS_TERMINAL_SERVER_AWARE",
    ),
];

static SUBSYSTEM_NAMES: &[(u16, &str)] = &[
    (IMAGE_SUBSYSTEM_UNKNOWN, "IMAGE_SUBSYSTEM_UNKNOWN"),
    (IMAGE_SUBSYSTEM_NATIVE, "IMAGE_SUBSYSTEM_NATIVE"),
    (IMAGE_SUBSYSTEM_WINDOWS_GUI, "IMAGE_SUBSYSTEM_WINDOWS_GUI"),
    (IMAGE_SUBSYSTEM_WINDOWS_CUI, "IMAGE_SUBSYSTEM_WINDOWS_CUI"),
    (IMAGE_SUBSYSTEM_OS2_CUI, "IMAGE_SUBSYSTEM_OS2_CUI"),
    (IMAGE_SUBSYSTEM_POSIX_CUI, "IMAGE_SUBSYSTEM_POSIX_CUI"),
    (IMAGE_SUBSYSTEM_WINDOWS_CE_GUI, "IMAGE_SUBSYSTEM_WINDOWS_CE_GUI"),
    (IMAGE_SUBSYSTEM_EFI_APPLICATION, "IMAGE_SUBSYSTEM_EFI_APPLICATION"),
    (IMAGE_SUBSYSTEM_EFI_BOOT_SERVICE_DRIVER, "IMAGE_SUBSYSTEM_EFI_BOOT_SERVICE_DRIVER"),
    (IMAGE_SUBSYSTEM_EFI_RUNTIME_DRIVER, "IMAGE_SUBSYSTEM_EFI_RUNTIME_DRIVER"),
    (IMAGE_SUBSYSTEM_EFI_ROM, "IMAGE_SUBSYSTEM_EFI_ROM"),
    (IMAGE_SUBSYSTEM_XBOX, "IMAGE_SUBSYSTEM_XBOX"),
    (
        IMAGE_SUBSYSTEM_WINDOWS_BOOT_APPLICATION,
        "IMAGE_SUBSYSTEM_WINDOWS_BOOT_APPLICATION",
    ),
];

static DIRECTORY_NAMES: &[(DirectoryEntry, &str)] = &[
    (DirectoryEntry::Export, "IMAGE_DIRECTORY_ENTRY_EXPORT"),
    (DirectoryEntry::Import, "IMAGE_DIRECTORY_ENTRY_IMPORT"),
    (DirectoryEntry::Resource, "IMAGE_DIRECTORY_ENTRY_RESOURCE"),
    (DirectoryEntry::Exception, "IMAGE_DIRECTORY_ENTRY_EXCEPTION"),
    (DirectoryEntry::Security, "IMAGE_DIRECTORY_ENTRY_SECURITY"),
    (DirectoryEntry::BaseReloc, "IMAGE_DIRECTORY_ENTRY_BASERELOC"),
    (DirectoryEntry::Debug, "IMAGE_DIRECTORY_ENTRY_DEBUG"),
    (DirectoryEntry::Architecture, "IMAGE_DIRECTORY_ENTRY_ARCHITECTURE"),
    (DirectoryEntry::GlobalPtr, "IMAGE_DIRECTORY_ENTRY_GLOBALPTR"),
    (DirectoryEntry::Tls, "IMAGE_DIRECTORY_ENTRY_TLS"),
    (DirectoryEntry::LoadConfig, "IMAGE_DIRECTORY_ENTRY_LOAD_CONFIG"),
    (DirectoryEntry::BoundImport, "IMAGE_DIRECTORY_ENTRY_BOUND_IMPORT"),
    (DirectoryEntry::Iat, "IMAGE_DIRECTORY_ENTRY_IAT"),
    (DirectoryEntry::DelayImport, "IMAGE_DIRECTORY_ENTRY_DELAY_IMPORT"),
    (DirectoryEntry::ComDescriptor, "IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR"),
    (DirectoryEntry::Reserved, "IMAGE_DIRECTORY_RESERVED"),
];

static SECTION_FLAG_NAMES: &[(u32, &str)] = &[
    (SectionCharacteristics::TYPE_NO_PAD.bits(), "IMAGE_SCN_TYPE_NO_PAD"),
    (SectionCharacteristics::CNT_CODE.bits(), "IMAGE_SCN_CNT_CODE"),
    (SectionCharacteristics::CNT_INITIALIZED_DATA.bits(), "IMAGE_SCN_CNT_INITIALIZED_DATA"),
    (SectionCharacteristics::CNT_UNINITIALIZED_DATA.bits(), "IMAGE_SCN_CNT_UNINITIALIZED_DATA"),
    (SectionCharacteristics::LNK_OTHER.bits(), "IMAGE_SCN_LNK_OTHER"),
    (SectionCharacteristics::LNK_INFO.bits(), "IMAGE_SCN_LNK_INFO"),
    (SectionCharacteristics::LNK_REMOVE.bits(), "IMAGE_SCN_LNK_REMOVE"),
    (SectionCharacteristics::LNK_COMDAT.bits(), "IMAGE_SCN_LNK_COMDAT"),
    (SectionCharacteristics::NO_DEFER_SPEC_EXC.bits(), "IMAGE_SCN_NO_DEFER_SPEC_EXC"),
    (SectionCharacteristics::GPREL.bits(), "IMAGE_SCN_GPREL"),
    (SectionCharacteristics::MEM_PURGEABLE.bits(), "IMAGE_SCN_MEM_PURGEABLE"),
    (SectionCharacteristics::MEM_LOCKED.bits(), "IMAGE_SCN_MEM_LOCKED"),
    (SectionCharacteristics::MEM_PRELOAD.bits(), "IMAGE_SCN_MEM_PRELOAD"),
    (SectionCharacteristics::LNK_NRELOC_OVFL.bits(), "IMAGE_SCN_LNK_NRELOC_OVFL"),
    (SectionCharacteristics::MEM_DISCARDABLE.bits(), "IMAGE_SCN_MEM_DISCARDABLE"),
    (SectionCharacteristics::MEM_NOT_CACHED.bits(), "IMAGE_SCN_MEM_NOT_CACHED"),
    (SectionCharacteristics::MEM_NOT_PAGED.bits(), "IMAGE_SCN_MEM_NOT_PAGED"),
    (SectionCharacteristics::MEM_SHARED.bits(), "IMAGE_SCN_MEM_SHARED"),
    (SectionCharacteristics::MEM_EXECUTE.bits(), "IMAGE_SCN_MEM_EXECUTE"),
    (SectionCharacteristics::MEM_READ.bits(), "IMAGE_SCN_MEM_READ"),
    (SectionCharacteristics::MEM_WRITE.bits(), "IMAGE_SCN_MEM_WRITE"),
];

// Values of the 4-bit alignment field, already shifted into place.
static SECTION_ALIGN_NAMES: &[(u32, &str)] = &[
    (0x0010_0000, "IMAGE_SCN_ALIGN_1BYTES"),
    (0x0020_0000, "IMAGE_SCN_ALIGN_2BYTES"),
    (0x0030_0000, "IMAGE_SCN_ALIGN_4BYTES"),
    (0x0040_0000, "IMAGE_SCN_ALIGN_8BYTES"),
    (0x0050_0000, "IMAGE_SCN_ALIGN_16BYTES"),
    (0x0060_0000, "IMAGE_SCN_ALIGN_32BYTES"),
    (0x0070_0000, "IMAGE_SCN_ALIGN_64BYTES"),
    (0x0080_0000, "IMAGE_SCN_ALIGN_128BYTES"),
    (0x0090_0000, "IMAGE_SCN_ALIGN_256BYTES"),
    (0x00A0_0000, "IMAGE_SCN_ALIGN_512BYTES"),
    (0x00B0_0000, "IMAGE_SCN_ALIGN_1024BYTES"),
    (0x00C0_0000, "IMAGE_SCN_ALIGN_2048BYTES"),
    (0x00D0_0000, "IMAGE_SCN_ALIGN_4096BYTES"),
    (0x00E0_0000, "IMAGE_SCN_ALIGN_8192BYTES"),
];

fn lookup<T: PartialEq + Copy>(table: &[(T, &'static str)], value: T) -> Option<&'static str> {
    table.iter().find(|(v, _)| *v == value).map(|(_, name)| *name)
}

pub fn machine_name(machine: u16) -> Option<&'static str> {
    lookup(MACHINE_NAMES, machine)
}

/// Name of a single COFF characteristic bit.
pub fn file_characteristic_name(flag: u16) -> Option<&'static str> {
    lookup(FILE_CHARACTERISTIC_NAMES, flag)
}

/// Name of a single `DllCharacteristics` bit.
pub fn dll_characteristic_name(flag: u16) -> Option<&'static str> {
    lookup(DLL_CHARACTERISTIC_NAMES, flag)
}

pub fn subsystem_name(subsystem: u16) -> Option<&'static str> {
    lookup(SUBSYSTEM_NAMES, subsystem)
}

/// Name of the data directory at `index` in the directory table.
pub fn directory_name(index: u32) -> Option<&'static str> {
    let entry = DirectoryEntry::from_index(usize::try_from(index).ok()?)?;
    lookup(DIRECTORY_NAMES, entry)
}

/// Name of a section characteristic value: a single flag bit, or a value of
/// the alignment field.
pub fn section_characteristic_name(value: u32) -> Option<&'static str> {
    lookup(SECTION_FLAG_NAMES, value).or_else(|| lookup(SECTION_ALIGN_NAMES, value))
}

/// Names of every known bit set in `bits`, in table order.
pub fn file_characteristic_names(bits: u16) -> Vec<&'static str> {
    FILE_CHARACTERISTIC_NAMES
        .iter()
        .filter(|(flag, _)| bits & flag == *flag)
        .map(|(_, name)| *name)
        .collect()
}

pub fn dll_characteristic_names(bits: u16) -> Vec<&'static str> {
    DLL_CHARACTERISTIC_NAMES
        .iter()
        .filter(|(flag, _)| bits & flag == *flag)
        .map(|(_, name)| *name)
        .collect()
}

/// Known flag names in `bits`, followed by the alignment name when the
/// alignment field holds a known value.
pub fn section_characteristic_names(bits: u32) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = SECTION_FLAG_NAMES
        .iter()
        .filter(|(flag, _)| bits & flag == *flag)
        .map(|(_, name)| *name)
        .collect();
    if let Some(align) = lookup(SECTION_ALIGN_NAMES, bits & IMAGE_SCN_ALIGN_MASK) {
        names.push(align);
    }
    names
}

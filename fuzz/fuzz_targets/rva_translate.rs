#![no_main]
use libfuzzer_sys::fuzz_target;
use peoverlay::PeFile;

// Trailing 8 bytes pick the address to translate.
fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    let (image, probe) = data.split_at(data.len() - 8);
    let mut raw = [0u8; 8];
    raw.copy_from_slice(probe);
    let address = u64::from_le_bytes(raw);

    if let Ok(pe) = PeFile::parse(image) {
        let offset = pe.rva_to_offset(address);
        let _ = pe.offset_to_rva(offset);
        let _ = pe.offset_to_rva(address);
        let _ = pe.section_for_rva(address);
    }
});

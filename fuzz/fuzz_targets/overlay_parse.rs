#![no_main]
use libfuzzer_sys::fuzz_target;
use peoverlay::{catalog, PeFile};

fuzz_target!(|data: &[u8]| {
    let Ok(pe) = PeFile::parse(data) else {
        return;
    };
    let _ = catalog::machine_name(pe.machine());
    for section in pe.sections().iter() {
        let _ = section.name();
        let _ = pe.section_data(section);
    }
    let _ = pe.entry_section();
});

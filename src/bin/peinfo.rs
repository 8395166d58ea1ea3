//! Print the header summary, directory table and section table of PE files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use peoverlay::catalog;
use peoverlay::logging::{init_tracing, init_tracing_json};
use peoverlay::{log_error, span_trace, OpenOptions, PeContext, PeFile};

/// peinfo - dump the PE/PE32+ header chain of one or more files
#[derive(Debug, Parser)]
#[command(name = "peinfo", version, about, long_about = None)]
struct Args {
    /// Map the files read-write instead of as a private copy.
    #[arg(long)]
    rw: bool,

    /// Emit log records as JSON on stderr.
    #[arg(long)]
    json_log: bool,

    /// PE files to inspect.
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,
}

fn unknown(value: Option<&'static str>) -> &'static str {
    value.unwrap_or("unknown")
}

fn print_pe(pe: &PeFile<'_>) {
    let coff = pe.coff_header();
    let opt = pe.optional_header();

    println!("  format:          {}", opt.kind());
    println!(
        "  signature:       {}",
        if pe.is_pe() { "PE" } else if pe.is_ne() { "NE" } else { "?" }
    );
    println!(
        "  machine:         {:#06x} ({})",
        coff.machine(),
        unknown(catalog::machine_name(coff.machine()))
    );
    println!("  sections:        {}", pe.sections_count());
    println!("  timestamp:       {:#010x}", coff.time_date_stamp());
    println!(
        "  characteristics: {:#06x} [{}]",
        coff.characteristics_raw(),
        catalog::file_characteristic_names(coff.characteristics_raw()).join(", ")
    );
    println!("  entry point:     {:#x}", pe.entry_point());
    println!("  image base:      {:#x}", pe.image_base());
    println!(
        "  subsystem:       {} ({})",
        opt.subsystem(),
        unknown(catalog::subsystem_name(opt.subsystem()))
    );
    println!(
        "  dll flags:       {:#06x} [{}]",
        opt.dll_characteristics_raw(),
        catalog::dll_characteristic_names(opt.dll_characteristics_raw()).join(", ")
    );

    println!("  directories ({}):", pe.directories_count());
    for (index, dir) in pe.directories().iter().enumerate() {
        if !dir.is_present() {
            continue;
        }
        println!(
            "    {:<40} rva={:#010x} size={:#x}",
            unknown(catalog::directory_name(index as u32)),
            dir.virtual_address(),
            dir.size()
        );
    }

    println!("  sections ({}):", pe.sections_count());
    for section in pe.sections().iter() {
        println!(
            "    {:<8} va={:#010x} vsize={:#08x} raw={:#08x} rawsize={:#08x} [{}]",
            section.name(),
            section.virtual_address(),
            section.virtual_size(),
            section.pointer_to_raw_data(),
            section.size_of_raw_data(),
            catalog::section_characteristic_names(section.characteristics_raw()).join(", ")
        );
    }

    if let Some(section) = pe.entry_section() {
        println!(
            "  entry point in {} at file offset {:#x}",
            section.name(),
            pe.rva_to_offset(u64::from(pe.entry_point()))
        );
    }
}

fn inspect(path: &Path, options: &OpenOptions) -> Result<()> {
    let span = span_trace!("inspect", path = %path.display());
    let _guard = span.enter();

    let ctx = PeContext::load(path, options)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let pe = ctx.pe().context("failed to bind parsed headers")?;

    println!("{} ({} bytes)", path.display(), pe.filesize());
    print_pe(&pe);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.json_log {
        init_tracing_json();
    } else {
        init_tracing();
    }

    let options = OpenOptions::new().read_write(args.rw);
    let mut failed = false;
    for path in &args.files {
        if let Err(e) = inspect(path, &options) {
            let e = log_error!(format!("{e:#}"), "inspection failed");
            eprintln!("{}: {e}", path.display());
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

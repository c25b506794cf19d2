use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use binsize_core::{Executable, Section};
use binsize_host::{CpuTopology, LogData, LogMessage, MemoryUsage, RamFs};

/// On-disk size of an executable's section data
#[derive(Parser)]
#[command(
    name = "binsize",
    about = "Report how many bytes of section data a PE or ELF executable carries",
    version,
    author
)]
struct Cli {
    /// Path to a PE or ELF executable
    #[arg(required = true)]
    path: std::path::PathBuf,

    /// List each section after the total
    #[arg(long, conflicts_with = "json")]
    sections: bool,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,

    /// Print host CPU and memory statistics to stderr
    #[arg(long)]
    stats: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let failed = err.use_stderr();
            let _ = err.print();
            return if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("binsize: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let exe = Executable::open(&cli.path)?;

    if cli.json {
        print_json(&cli.path, &exe)?;
    } else {
        println!("Size of the executable: {} bytes", exe.total_size);
        if cli.sections {
            print_sections(&exe.sections);
        }
    }

    if cli.stats {
        print_stats(&exe);
    }

    Ok(())
}

fn print_sections(sections: &[Section]) {
    if sections.is_empty() {
        println!("No sections found (possibly stripped binary).");
        return;
    }
    println!(
        "{:<20} {:<18} {:<10} {:<10} {:<10}",
        "Section", "Address", "RawSize", "Offset", "Flags"
    );
    println!("{}", "-".repeat(70));
    for s in sections {
        println!(
            "{:<20} 0x{:<16x} {:<10} {:<10x} {:<10x}",
            s.name, s.addr, s.raw_size, s.file_offset, s.flags
        );
    }
}

#[derive(Serialize)]
struct Report<'a> {
    path: String,
    format: &'static str,
    total_size: u64,
    sections: Vec<SectionReport<'a>>,
}

#[derive(Serialize)]
struct SectionReport<'a> {
    name: &'a str,
    addr: u64,
    raw_size: u64,
    file_offset: u64,
    flags: u64,
}

fn print_json(path: &Path, exe: &Executable) -> Result<()> {
    let report = Report {
        path: path.display().to_string(),
        format: exe.format.name(),
        total_size: exe.total_size,
        sections: exe
            .sections
            .iter()
            .map(|s| SectionReport {
                name: &s.name,
                addr: s.addr,
                raw_size: s.raw_size,
                file_offset: s.file_offset,
                flags: s.flags,
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_stats(exe: &Executable) {
    match CpuTopology::read() {
        Ok(cpu) => {
            let cores = cpu
                .cores_per_package
                .map(|c| format!(", {c} cores per package"))
                .unwrap_or_default();
            eprintln!("CPU: {} logical processors{}", cpu.logical_cpus, cores);
        }
        Err(err) => log::warn!("cpu topology unavailable: {err}"),
    }

    match MemoryUsage::read() {
        Ok(mem) => eprintln!(
            "Memory: {} KiB resident, {} KiB peak",
            mem.current_rss_kib, mem.peak_rss_kib
        ),
        Err(err) => log::warn!("memory usage unavailable: {err}"),
    }

    let mut fs = RamFs::new();
    let summary = LogMessage {
        module: "binsize".to_string(),
        text: format!(
            "{} image, {} sections",
            exe.format.name(),
            exe.sections.len()
        ),
        data: Some(LogData::Int(exe.total_size as i64)),
    };
    fs.log(&summary.to_string());
    if let Err(err) = fs.flush_log("binsize.log") {
        log::warn!("could not stage the run log: {err}");
    }
    eprintln!("Ram-fs: {} bytes staged", fs.memory_usage());
}

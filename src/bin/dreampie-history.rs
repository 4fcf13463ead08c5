//! Inspect DreamPie history files.
//!
//! Usage:
//!   dreampie-history check <FILE> <TAG>...
//!   dreampie-history text <FILE> <TAG>...
//!
//! Tags are the span classes the file may use, listed from lowest to
//! highest priority.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use dreampie_history::{load_history, DecodeLimits, HistoryError, StyledBuffer, Tag, TagTable};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Command {
    Check,
    Text,
}

impl Command {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "check" => Some(Self::Check),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

fn usage() {
    eprintln!("Usage: dreampie-history <check|text> <FILE> <TAG>...");
    eprintln!();
    eprintln!("  check   decode FILE and print a run/tag summary");
    eprintln!("  text    decode FILE and print its plain text");
    eprintln!();
    eprintln!("TAGs are the span classes FILE may use, lowest priority first.");
}

fn tag_table(names: &[String]) -> Result<TagTable, HistoryError> {
    let table = TagTable::from_tags(
        names
            .iter()
            .enumerate()
            .map(|(priority, name)| Tag::new(name.as_str(), priority as i32)),
    )?;
    Ok(table)
}

fn print_summary(path: &Path, buffer: &StyledBuffer, table: &TagTable) {
    let mut per_tag: BTreeMap<&str, usize> = BTreeMap::new();
    for run in buffer.runs() {
        for tag in run.tags.iter().filter_map(|&id| table.get(id)) {
            *per_tag.entry(tag.name()).or_default() += run.text.len();
        }
    }
    println!("{}: ok", path.display());
    println!("  runs:  {}", buffer.run_count());
    println!("  bytes: {}", buffer.len());
    for (name, bytes) in per_tag {
        println!("  span.{}: {} bytes", name, bytes);
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage();
        return ExitCode::SUCCESS;
    }
    let (Some(command), Some(file)) = (args.first().and_then(|a| Command::from_str(a)), args.get(1))
    else {
        usage();
        return ExitCode::from(2);
    };
    let path = PathBuf::from(file);

    let table = match tag_table(&args[2..]) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let buffer = match load_history(&path, &table, DecodeLimits::unbounded()) {
        Ok(buffer) => buffer,
        Err(e) => {
            eprintln!("{}: {}", path.display(), e);
            return ExitCode::from(1);
        }
    };

    match command {
        Command::Check => print_summary(&path, &buffer, &table),
        Command::Text => print!("{}", buffer.text()),
    }
    ExitCode::SUCCESS
}

// Command-line front end for oxibps.
//
// Subcommands map onto the engine and file helpers: `create` builds a
// patch, `apply` reconstructs the modified file, `info` describes a patch
// and `config` prints build settings. Each command prints one status line
// and returns a process exit code.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::bps::decoder::DEFAULT_MAX_TARGET_SIZE;
use crate::bps::{ActionKind, checksum};
use crate::engine::{self, ApplyOptions, ApplyStatus, CreateOptions, PatchSummary};
use crate::hash::config::{self, DEFAULT_LEVEL};
use crate::io::{self as fileio, DEFAULT_MAX_INPUT};

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1u64),
    };
    let num: u64 = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// BPS1 binary patch creator/applier.
#[derive(Parser, Debug)]
#[command(
    name = "oxibps",
    version,
    about = "BPS1 binary patch creator/applier",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a patch turning ORIGINAL into MODIFIED.
    Create(CreateArgs),
    /// Apply a patch to ORIGINAL.
    Apply(ApplyArgs),
    /// Print header, checksums and action statistics of a patch.
    Info(InfoArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Matcher level (0-9).
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(0..=9), default_value_t = DEFAULT_LEVEL)]
    level: u32,

    /// Metadata text stored in the patch.
    #[arg(long, conflicts_with = "metadata_file")]
    metadata: Option<String>,

    /// File whose contents are stored as patch metadata.
    #[arg(long = "metadata-file", value_hint = ValueHint::FilePath)]
    metadata_file: Option<PathBuf>,

    /// Refuse inputs larger than this (supports K/M/G suffix).
    #[arg(long = "max-size", value_parser = parse_byte_size, default_value_t = DEFAULT_MAX_INPUT)]
    max_size: u64,

    /// Patch file to write (`.bps` is appended when missing).
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Original file.
    #[arg(value_hint = ValueHint::FilePath)]
    original: PathBuf,

    /// Modified file.
    #[arg(value_hint = ValueHint::FilePath)]
    modified: PathBuf,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Output file (default: overwrite ORIGINAL).
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Write the output even if the patch checksum is wrong.
    #[arg(long = "unsafe")]
    allow_unsafe: bool,

    /// Discard the output when a content checksum does not match.
    #[arg(long)]
    strict: bool,

    /// Refuse patches declaring a larger output (supports K/M/G suffix).
    #[arg(long = "max-target-size", value_parser = parse_byte_size, default_value_t = DEFAULT_MAX_TARGET_SIZE)]
    max_target_size: u64,

    /// Refuse an original or patch larger than this (supports K/M/G suffix).
    #[arg(long = "max-size", value_parser = parse_byte_size, default_value_t = DEFAULT_MAX_INPUT)]
    max_size: u64,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Original file.
    #[arg(value_hint = ValueHint::FilePath)]
    original: PathBuf,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// List every action with its output offset.
    #[arg(long)]
    actions: bool,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Create,
    Apply,
    Info,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    level: u32,
    metadata: Option<String>,
    metadata_file: Option<PathBuf>,
    max_input: u64,
    allow_unsafe: bool,
    strict: bool,
    max_target_size: u64,
    list_actions: bool,
    patch_file: Option<PathBuf>,
    original_file: Option<PathBuf>,
    modified_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl Options {
    fn base(command: Command, cli: &Cli) -> Self {
        Self {
            command,
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(2),
            json_output: cli.json_output,
            level: DEFAULT_LEVEL,
            metadata: None,
            metadata_file: None,
            max_input: DEFAULT_MAX_INPUT,
            allow_unsafe: false,
            strict: false,
            max_target_size: DEFAULT_MAX_TARGET_SIZE,
            list_actions: false,
            patch_file: None,
            original_file: None,
            modified_file: None,
            output_file: None,
        }
    }

    /// Log filter implied by -q / -v.
    fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    match &cli.command {
        Cmd::Create(args) => Options {
            level: args.level,
            metadata: args.metadata.clone(),
            metadata_file: args.metadata_file.clone(),
            max_input: args.max_size,
            patch_file: Some(with_patch_extension(&args.patch)),
            original_file: Some(args.original.clone()),
            modified_file: Some(args.modified.clone()),
            ..Options::base(Command::Create, &cli)
        },
        Cmd::Apply(args) => Options {
            allow_unsafe: args.allow_unsafe,
            strict: args.strict,
            max_target_size: args.max_target_size,
            max_input: args.max_size,
            patch_file: Some(args.patch.clone()),
            original_file: Some(args.original.clone()),
            output_file: Some(args.output.clone().unwrap_or_else(|| args.original.clone())),
            ..Options::base(Command::Apply, &cli)
        },
        Cmd::Info(args) => Options {
            list_actions: args.actions,
            patch_file: Some(args.patch.clone()),
            ..Options::base(Command::Info, &cli)
        },
        Cmd::Config => Options::base(Command::Config, &cli),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("oxibps".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn print_json(value: &serde_json::Value) {
    eprintln!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn required<'a>(path: &'a Option<PathBuf>, what: &str) -> Result<&'a Path, i32> {
    path.as_deref().ok_or_else(|| {
        eprintln!("oxibps: missing {what} file");
        1
    })
}

/// `path` with `.bps` appended unless it already ends in `.bps`.
fn with_patch_extension(path: &Path) -> PathBuf {
    let has_ext = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bps"));
    if has_ext {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".bps");
    PathBuf::from(name)
}

/// Whether two paths name the same file. Falls back to comparing the
/// paths as given when either one does not exist yet.
fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn refuse_same_file(a: &Path, a_role: &str, b: &Path, b_role: &str) -> bool {
    if same_file(a, b) {
        eprintln!(
            "oxibps: {a_role} and {b_role} must be different files: {}",
            a.display()
        );
        return true;
    }
    false
}

fn refuse_overwrite(path: &Path, force: bool) -> bool {
    if path.exists() && !force {
        eprintln!(
            "oxibps: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return true;
    }
    false
}

fn status_name(status: &ApplyStatus) -> &'static str {
    match status {
        ApplyStatus::Success => "success",
        ApplyStatus::Warning(_) => "warning",
        ApplyStatus::Error(_) => "error",
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("oxibps version {version} (Rust), Copyright (C) oxibps contributors");
    eprintln!("Licensed under the MIT License");

    let file_io = cfg!(feature = "file-io") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("FILE_IO={file_io}");
    eprintln!("DEFAULT_LEVEL={DEFAULT_LEVEL}");
    eprintln!("DEFAULT_MAX_INPUT={DEFAULT_MAX_INPUT}");
    eprintln!("DEFAULT_MAX_TARGET_SIZE={DEFAULT_MAX_TARGET_SIZE}");
    for level in 0..=9 {
        let p = config::config_for_level(level);
        eprintln!(
            "LEVEL_{level}={} (chain={}, lazy={}, long_enough={})",
            p.name, p.chain, p.lazy as u8, p.long_enough
        );
    }
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Create command
// ---------------------------------------------------------------------------

fn cmd_create(opts: &Options) -> i32 {
    let (patch_path, original_path, modified_path) = match (
        required(&opts.patch_file, "patch"),
        required(&opts.original_file, "original"),
        required(&opts.modified_file, "modified"),
    ) {
        (Ok(p), Ok(o), Ok(m)) => (p, o, m),
        _ => return 1,
    };
    if refuse_same_file(patch_path, "patch", original_path, "original")
        || refuse_same_file(patch_path, "patch", modified_path, "modified")
    {
        return 1;
    }
    if refuse_overwrite(patch_path, opts.force) {
        return 1;
    }

    let metadata = match (&opts.metadata, &opts.metadata_file) {
        (Some(text), _) => text.as_bytes().to_vec(),
        (None, Some(path)) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("oxibps: metadata file: {}: {e}", path.display());
                return 1;
            }
        },
        (None, None) => Vec::new(),
    };

    if let (Ok(o), Ok(m)) = (std::fs::metadata(original_path), std::fs::metadata(modified_path)) {
        log::info!(
            "estimated working set: {} bytes",
            engine::estimate_create_memory(o.len() as usize, m.len() as usize)
        );
    }

    let create_opts = CreateOptions {
        level: opts.level,
        metadata,
    };
    let stats = match fileio::create_file(
        original_path,
        modified_path,
        patch_path,
        &create_opts,
        opts.max_input,
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("oxibps: create: {e}");
            return 1;
        }
    };

    if !opts.quiet {
        eprintln!(
            "oxibps: created {} ({} bytes)",
            patch_path.display(),
            stats.patch_size
        );
    }
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "oxibps: original size: {}, modified size: {}, level: {} ({})",
            stats.original_size,
            stats.modified_size,
            opts.level,
            config::config_for_level(opts.level).name
        );
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "create",
            "original_size": stats.original_size,
            "modified_size": stats.modified_size,
            "patch_size": stats.patch_size,
            "level": opts.level,
            "metadata_size": create_opts.metadata.len(),
            "original_sha256": stats.original_sha256.map(|d| hex(&d)),
            "modified_sha256": stats.modified_sha256.map(|d| hex(&d)),
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Apply command
// ---------------------------------------------------------------------------

fn cmd_apply(opts: &Options) -> i32 {
    let (patch_path, original_path, output_path) = match (
        required(&opts.patch_file, "patch"),
        required(&opts.original_file, "original"),
        required(&opts.output_file, "output"),
    ) {
        (Ok(p), Ok(o), Ok(out)) => (p, o, out),
        _ => return 1,
    };
    if refuse_same_file(output_path, "output", patch_path, "patch") {
        return 1;
    }
    if output_path != original_path && refuse_overwrite(output_path, opts.force) {
        return 1;
    }

    let apply_opts = ApplyOptions {
        allow_unsafe: opts.allow_unsafe,
        max_target_size: opts.max_target_size,
    };
    let strict = opts.strict;
    let report = match fileio::apply_file_with(
        original_path,
        patch_path,
        output_path,
        &apply_opts,
        opts.max_input,
        |status| !(strict && status.is_warning()),
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("oxibps: apply: {e}");
            return 1;
        }
    };

    let message = report.status.message();
    match (&report.status, report.written) {
        (ApplyStatus::Success, _) => {
            if !opts.quiet {
                eprintln!("oxibps: patched {}", output_path.display());
            }
        }
        (ApplyStatus::Warning(_), true) => eprintln!("oxibps: {message}"),
        (ApplyStatus::Warning(_), false) => eprintln!("oxibps: {message}; output discarded"),
        (ApplyStatus::Error(_), true) => {
            eprintln!("oxibps: {message}; output written anyway (--unsafe)")
        }
        (ApplyStatus::Error(_), false) => eprintln!("oxibps: {message}"),
    }
    if opts.verbose > 0 && !opts.quiet && !report.metadata.is_empty() {
        eprintln!(
            "oxibps: metadata: {}",
            String::from_utf8_lossy(&report.metadata)
        );
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "apply",
            "status": status_name(&report.status),
            "message": message,
            "output_size": report.output_size,
            "written": report.written,
            "metadata_size": report.metadata.len(),
            "output_sha256": report.output_sha256.map(|d| hex(&d)),
        }));
    }

    if report.written && !report.status.is_error() {
        0
    } else {
        1
    }
}

// ---------------------------------------------------------------------------
// Info command
// ---------------------------------------------------------------------------

fn print_summary(s: &PatchSummary) {
    let check = if s.self_checksum_ok { "ok" } else { "MISMATCH" };
    println!("BPS1 patch size:              {}", s.patch_size);
    println!("Original size:                {}", s.header.source_size);
    println!("Modified size:                {}", s.header.target_size);
    println!("Metadata size:                {}", s.header.metadata.len());
    if !s.header.metadata.is_empty() {
        println!(
            "Metadata:                     {}",
            String::from_utf8_lossy(&s.header.metadata)
        );
    }
    println!("Original CRC32:               {:#010x}", s.footer.source_crc);
    println!("Modified CRC32:               {:#010x}", s.footer.target_crc);
    println!("Patch CRC32:                  {:#010x} ({check})", s.footer.patch_crc);
    println!("Actions:                      {}", s.total_actions());
    for kind in ActionKind::ALL {
        println!(
            "  {:<28}{} ({} bytes)",
            format!("{kind}:"),
            s.count(kind),
            s.bytes(kind)
        );
    }
}

fn cmd_info(opts: &Options) -> i32 {
    let patch_path = match required(&opts.patch_file, "patch") {
        Ok(p) => p,
        Err(code) => return code,
    };
    let (patch, summary) = match fileio::inspect_file(patch_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("oxibps: {}: {e}", patch_path.display());
            return 1;
        }
    };

    print_summary(&summary);

    if opts.list_actions {
        let reader = match engine::open_actions(&patch) {
            Ok((_, _, reader)) => reader,
            Err(e) => {
                eprintln!("oxibps: {e}");
                return 1;
            }
        };
        println!();
        println!("  Offset      Action");
        let mut offset = 0u64;
        for action in reader {
            match action {
                Ok(a) => {
                    println!("  {offset:010}  {a}");
                    offset += a.len();
                }
                Err(e) => {
                    eprintln!("oxibps: {e}");
                    return 1;
                }
            }
        }
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "info",
            "patch_size": summary.patch_size,
            "source_size": summary.header.source_size,
            "target_size": summary.header.target_size,
            "metadata_size": summary.header.metadata.len(),
            "source_crc": summary.footer.source_crc,
            "target_crc": summary.footer.target_crc,
            "patch_crc": summary.footer.patch_crc,
            "self_checksum_ok": summary.self_checksum_ok,
            "computed_patch_crc": checksum::crc32(&patch[..patch.len() - 4]),
            "actions": {
                "source_read": summary.count(ActionKind::SourceRead),
                "target_read": summary.count(ActionKind::TargetRead),
                "source_copy": summary.count(ActionKind::SourceCopy),
                "target_copy": summary.count(ActionKind::TargetCopy),
            },
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(opts.log_filter()))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Create => cmd_create(&opts),
        Command::Apply => cmd_apply(&opts),
        Command::Info => cmd_info(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use xxhash_rust::xxh3::xxh3_64;

use snapbridge_codecs::SnappyCodec;
use snapbridge_core::format::{DEFAULT_BLOCK_SIZE, DEFAULT_MAX_UNCOMPRESSED_LEN, HEADER_LENGTH};
use snapbridge_core::{BridgeConfig, DecompressionBridge, LengthPolicy, Reader, Writer};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "snapbridge",
    about = "Frame, decompress, and inspect snappy block streams",
    version
)]
struct Cli {
    /// How a caller-supplied payload length is reconciled with the frame header
    #[arg(long, value_enum, global = true, default_value_t = PolicyArg::RequireMatch)]
    length_policy: PolicyArg,
    /// Largest uncompressed block accepted, in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_UNCOMPRESSED_LEN)]
    max_block_size: usize,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    RequireMatch,
    TrustCaller,
    TrustEmbedded,
}

impl From<PolicyArg> for LengthPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::RequireMatch => LengthPolicy::RequireMatch,
            PolicyArg::TrustCaller => LengthPolicy::TrustCaller,
            PolicyArg::TrustEmbedded => LengthPolicy::TrustEmbedded,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into snappy frames
    Compress {
        /// Source file ("-" reads stdin)
        input: PathBuf,
        /// Destination block stream
        output: PathBuf,
        /// Raw bytes per block (default: 65536 = 64 KB)
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: u32,
    },
    /// Decompress every frame of a block stream back to raw bytes
    Decompress {
        /// Source block stream ("-" reads stdin)
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
    },
    /// Print per-stream and per-frame statistics
    Inspect {
        /// Block stream to inspect
        file: PathBuf,
        /// Print per-frame details
        #[arg(long)]
        blocks: bool,
    },
    /// Decompress a single frame by index
    ReadBlock {
        /// Block stream
        file: PathBuf,
        /// Zero-based frame index to read
        #[arg(short, long)]
        index: u64,
        /// Write raw bytes to a file instead of printing a hex dump
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn build_bridge(cli: &Cli) -> anyhow::Result<Arc<DecompressionBridge>> {
    let config = BridgeConfig::default()
        .with_length_policy(cli.length_policy.into())
        .with_max_uncompressed_len(cli.max_block_size);
    let bridge = DecompressionBridge::initialized(Arc::new(SnappyCodec), config)
        .context("initializing the decompression bridge")?;
    Ok(Arc::new(bridge))
}

fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    if path.to_str() == Some("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("opening input file {:?}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &Path) -> anyhow::Result<Box<dyn Write>> {
    if path.to_str() == Some("-") {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(path).with_context(|| format!("creating output file {:?}", path))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn throughput(bytes: u64, secs: f64) -> String {
    if secs <= 0.0 {
        return "n/a".to_string();
    }
    format!("{}/s", human_bytes((bytes as f64 / secs) as u64))
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(
    bridge: Arc<DecompressionBridge>,
    input: PathBuf,
    output: PathBuf,
    block_size: u32,
) -> anyhow::Result<()> {
    let mut src = open_input(&input)?;
    let dst = open_output(&output)?;
    let mut writer = Writer::new(dst, bridge, block_size)?;

    let t0 = Instant::now();
    let mut buf = vec![0u8; block_size as usize];
    let mut bytes_read = 0u64;
    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write(&buf[..n])?;
        bytes_read += n as u64;
    }
    let block_count = writer.finish()?;
    let elapsed = t0.elapsed().as_secs_f64();
    let compressed_size = if output.to_str() == Some("-") {
        0
    } else {
        std::fs::metadata(&output)?.len()
    };

    info!("compressed {:?} into {} frames", input, block_count);
    eprintln!("  block size  : {}", human_bytes(block_size as u64));
    eprintln!("  blocks      : {}", block_count);
    eprintln!("  raw size    : {}", human_bytes(bytes_read));
    if compressed_size > 0 {
        eprintln!("  compressed  : {}", human_bytes(compressed_size));
        eprintln!("  ratio       : {:.2}x", bytes_read as f64 / compressed_size as f64);
    }
    eprintln!("  throughput  : {}", throughput(bytes_read, elapsed));
    eprintln!("  elapsed     : {:.3}s", elapsed);
    Ok(())
}

fn run_decompress(bridge: Arc<DecompressionBridge>, input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let mut reader = Reader::new(open_input(&input)?, bridge)?;
    let mut dst = open_output(&output)?;

    let t0 = Instant::now();
    let mut total_raw = 0u64;
    while let Some(block) = reader
        .next_block()
        .with_context(|| format!("decoding frame {}", reader.frames_read()))?
    {
        total_raw += block.len() as u64;
        dst.write_all(&block)?;
    }
    dst.flush()?;

    let elapsed = t0.elapsed().as_secs_f64();
    info!("decompressed {} frames from {:?}", reader.frames_read(), input);
    eprintln!("  blocks      : {}", reader.frames_read());
    eprintln!("  raw size    : {}", human_bytes(total_raw));
    eprintln!("  throughput  : {}", throughput(total_raw, elapsed));
    eprintln!("  elapsed     : {:.3}s", elapsed);
    Ok(())
}

fn run_inspect(bridge: Arc<DecompressionBridge>, file: PathBuf, show_blocks: bool) -> anyhow::Result<()> {
    let file_size = std::fs::metadata(&file)
        .with_context(|| format!("reading metadata of {:?}", file))?
        .len();
    let mut reader = Reader::new(open_input(&file)?, bridge)?;

    let mut rows = Vec::new();
    let mut raw_size = 0u64;
    let mut payload_size = 0u64;
    while let Some(frame) = reader.next_frame()? {
        raw_size += frame.header.uncompressed_len as u64;
        payload_size += frame.header.compressed_len;
        if show_blocks {
            rows.push((frame, xxh3_64(reader.payload())));
        }
    }

    println!("=== Block stream: {:?} ===", file);
    println!();
    println!("  frames         : {}", reader.frames_read());
    println!("  raw size       : {}", human_bytes(raw_size));
    println!("  payload bytes  : {}", human_bytes(payload_size));
    println!("  header bytes   : {}", human_bytes(reader.frames_read() * HEADER_LENGTH as u64));
    println!("  file on disk   : {}", human_bytes(file_size));
    if file_size > 0 {
        println!("  ratio          : {:.2}x", raw_size as f64 / file_size as f64);
    }

    if show_blocks {
        println!();
        println!(
            "  {:>8}  {:>14}  {:>12}  {:>12}  {:>16}",
            "block", "file offset", "compressed", "raw", "xxh3"
        );
        println!("  {}", "-".repeat(70));
        for (frame, digest) in rows {
            println!(
                "  {:>8}  {:>14}  {:>12}  {:>12}  {:016x}",
                frame.index,
                frame.offset,
                human_bytes(frame.header.compressed_len),
                human_bytes(frame.header.uncompressed_len as u64),
                digest
            );
        }
    }

    Ok(())
}

fn run_read_block(
    bridge: Arc<DecompressionBridge>,
    file: PathBuf,
    index: u64,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut reader = Reader::new(open_input(&file)?, bridge)?;

    let frame = loop {
        match reader.next_frame()? {
            Some(frame) if frame.index == index => break frame,
            Some(_) => continue,
            None => anyhow::bail!(
                "block index {} out of range (stream has {} frames)",
                index,
                reader.frames_read()
            ),
        }
    };
    eprintln!("found frame {} at offset {} bytes", index, frame.offset);

    let t0 = Instant::now();
    let raw = reader.decode_current()?;
    eprintln!(
        "  decoded {} in {:.3}ms",
        human_bytes(raw.len() as u64),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    match output {
        Some(path) => {
            std::fs::write(&path, &raw).with_context(|| format!("writing {:?}", path))?;
            eprintln!("  written to {:?}", path);
        }
        None => {
            // Hex dump of the first 256 bytes
            let preview = &raw[..raw.len().min(256)];
            println!("--- block {} ({} bytes, first {} shown) ---", index, raw.len(), preview.len());
            for (i, chunk) in preview.chunks(16).enumerate() {
                print!("  {:04x}  ", i * 16);
                for b in chunk {
                    print!("{:02x} ", b);
                }
                for _ in chunk.len()..16 {
                    print!("   ");
                }
                print!("  |");
                for b in chunk {
                    if b.is_ascii_graphic() || *b == b' ' {
                        print!("{}", *b as char);
                    } else {
                        print!(".");
                    }
                }
                println!("|");
            }
            if raw.len() > 256 {
                println!("  ... ({} bytes remaining not shown)", raw.len() - 256);
            }
        }
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let bridge = build_bridge(&cli)?;
    match cli.command {
        Commands::Compress {
            input,
            output,
            block_size,
        } => run_compress(bridge, input, output, block_size),
        Commands::Decompress { input, output } => run_decompress(bridge, input, output),
        Commands::Inspect { file, blocks } => run_inspect(bridge, file, blocks),
        Commands::ReadBlock {
            file,
            index,
            output,
        } => run_read_block(bridge, file, index, output),
    }
}

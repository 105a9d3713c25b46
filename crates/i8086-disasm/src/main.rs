use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use i8086_disasm::{load_image, load_raw_bin};
use i8086_rs::{write_listing, I8086Decoder, ListingConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "8086 a.out disassembler", long_about = None)]
struct Cli {
    /// Input executable path
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// Treat the input as a bare text segment (no a.out header)
    #[arg(long)]
    raw: bool,
    /// Skip N bytes at start of file (raw mode)
    #[arg(long, default_value_t = 0usize, requires = "raw")]
    skip: usize,
    /// Limit bytes loaded (raw mode, default: to EOF after --skip)
    #[arg(long, requires = "raw")]
    len: Option<usize>,
    /// Listing options as JSON ({ "show_header", "show_bytes", "hex_width" })
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Do not print the header summary
    #[arg(long)]
    no_header: bool,
    /// Do not print raw instruction bytes
    #[arg(long)]
    no_bytes: bool,
    /// Width of the raw-bytes column
    #[arg(long)]
    hex_width: Option<usize>,
    /// Write the listing to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
    /// More log output on stderr (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn listing_config(cli: &Cli) -> Result<ListingConfig> {
    let mut cfg = match &cli.config {
        Some(path) => ListingConfig::load(path)?,
        None => ListingConfig::default(),
    };
    if cli.no_header {
        cfg.show_header = false;
    }
    if cli.no_bytes {
        cfg.show_bytes = false;
    }
    if let Some(width) = cli.hex_width {
        cfg.hex_width = width;
    }
    Ok(cfg)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg = listing_config(&cli)?;

    let image = if cli.raw {
        load_raw_bin(&cli.input, cli.skip, cli.len)?
    } else {
        load_image(&cli.input)?
    };
    debug!(text = image.text.len(), "image loaded");

    let mut out: Box<dyn Write> = match &cli.out {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    if cfg.show_header {
        if let Some(header) = &image.header {
            writeln!(out, "{header}")?;
        }
    }

    let dec = I8086Decoder::new();
    let result = write_listing(&dec, &image.text, &cfg, &mut out);
    out.flush()?;
    result?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from(["i8086-disasm", "a.out", "--no-bytes", "--hex-width", "20"]);
        let cfg = listing_config(&cli).unwrap();
        assert!(cfg.show_header);
        assert!(!cfg.show_bytes);
        assert_eq!(cfg.hex_width, 20);
    }

    #[test]
    fn raw_window_requires_raw_mode() {
        assert!(Cli::try_parse_from(["i8086-disasm", "a.out", "--skip", "4"]).is_err());
        assert!(Cli::try_parse_from(["i8086-disasm", "a.out", "--raw", "--skip", "4"]).is_ok());
    }

    #[test]
    fn missing_input_is_rejected() {
        assert!(Cli::try_parse_from(["i8086-disasm"]).is_err());
    }

    #[test]
    fn config_file_then_flags() {
        let path = std::env::temp_dir().join("_i8086_disasm_cfg.json");
        std::fs::write(&path, r#"{ "show_header": false, "hex_width": 10 }"#).unwrap();
        let args: [std::ffi::OsString; 6] = [
            "i8086-disasm".into(),
            "a.out".into(),
            "--config".into(),
            path.clone().into_os_string(),
            "--hex-width".into(),
            "12".into(),
        ];
        let cli = Cli::parse_from(args);
        let cfg = listing_config(&cli).unwrap();
        assert!(!cfg.show_header);
        assert_eq!(cfg.hex_width, 12);
        let _ = std::fs::remove_file(&path);
    }
}

mod skeleton;
mod timecode;

use std::io::stderr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use hifitime::Epoch;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert CDF skeletons between the tabular (JSON workbook) and skeleton table text
    /// formats.
    ///
    /// Formats are inferred from file extensions, .json for tabular and .skt for text,
    /// unless given with --from and --to.
    Skeleton {
        /// Input format
        #[arg(long)]
        from: Option<skeleton::Format>,

        /// Output format. Defaults to the format of --output, or the format other than the
        /// input format.
        #[arg(long)]
        to: Option<skeleton::Format>,

        /// Derive zVariable pad values from their data types rather than the Options sheet.
        #[arg(long, action)]
        auto_pad: bool,

        /// Delete output files if they already exist
        #[arg(long, action)]
        clobber: bool,

        /// Output file path when converting a single input.
        #[arg(short, long, value_name = "path", conflicts_with = "output_dir")]
        output: Option<PathBuf>,

        /// Output directory when converting multiple inputs. Each output is named after its
        /// input with the output format extension.
        #[arg(short = 'd', long, value_name = "dir")]
        output_dir: Option<PathBuf>,

        /// Input skeleton files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Decode a CCSDS time code.
    Timecode {
        /// P-field (preamble) as a decimal, 0x hex or 0b binary number.
        #[arg(value_parser = parse_pfield)]
        pfield: u16,

        /// T-field bytes as a hex string, e.g., 56d703a4ec90
        tfield: String,

        /// Agency epoch (RFC3339) for CDS level 2 time codes.
        #[arg(short, long, value_parser = parse_timestamp, value_name = "timestamp")]
        epoch: Option<Epoch>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: timecode::Format,
    },
}

fn parse_timestamp(s: &str) -> Result<Epoch, String> {
    Epoch::from_str(s).map_err(|_| "Could not parse into an RFC3339 timestamp".to_string())
}

fn parse_pfield(s: &str) -> Result<u16, String> {
    let zult = if let Some(hex) = s.strip_prefix("0x") {
        u16::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b") {
        u16::from_str_radix(&bin.replace('_', ""), 2)
    } else {
        s.parse()
    };
    zult.map_err(|err| format!("invalid p-field {s:?}: {err}"))
}

fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(cleaned.trim_start_matches("0x")).map_err(|err| format!("invalid hex: {err}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("CDFTOOLS_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Skeleton {
            from,
            to,
            auto_pad,
            clobber,
            output,
            output_dir,
            inputs,
        } => {
            let opts = skeleton::Opts {
                from: *from,
                to: *to,
                auto_pad: *auto_pad,
                clobber: *clobber,
            };
            match (output, output_dir, inputs.as_slice()) {
                (Some(output), None, [input]) => skeleton::convert(input, output, &opts),
                (Some(_), None, _) => bail!("--output requires a single input; use --output-dir"),
                (None, Some(dir), inputs) => skeleton::convert_all(inputs, dir, &opts),
                (None, None, _) => bail!("one of --output or --output-dir is required"),
                (Some(_), Some(_), _) => bail!("--output conflicts with --output-dir"),
            }
        }
        Commands::Timecode {
            pfield,
            tfield,
            epoch,
            format,
        } => {
            let tfield = parse_hex(tfield).map_err(anyhow::Error::msg)?;
            timecode::timecode(*pfield, &tfield, *epoch, format)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pfield_radix() {
        assert_eq!(parse_pfield("8"), Ok(8));
        assert_eq!(parse_pfield("0x2e"), Ok(0x2e));
        assert_eq!(parse_pfield("0b0011_0010"), Ok(0b0011_0010));
        assert!(parse_pfield("0xzz").is_err());
    }

    #[test]
    fn hex_field() {
        assert_eq!(parse_hex("56 d7 03"), Ok(vec![0x56, 0xd7, 0x03]));
        assert!(parse_hex("5").is_err());
    }

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

//! fried CLI - convert images to and from the FRIED format.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use fried::io::file::{decode_file, encode_file};

/// Encode and decode FRIED still images.
#[derive(Parser, Debug)]
#[command(name = "fried")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
EXAMPLES:
    fried encode photo.png photo.fried        Encode at the default quantizer (31)
    fried encode photo.png photo.fried 8      Finer quantizer, larger file
    fried decode photo.fried photo.png        Decode to PNG")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode an image file (any format the `image` crate reads) as FRIED
    Encode {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        /// Quantizer byte: 0 is the finest, each +8 doubles the step
        #[arg(default_value_t = 31)]
        quality: u8,
    },
    /// Decode a FRIED file; the output format follows the extension
    Decode {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

fn run(args: Args) -> fried::Result<()> {
    match args.command {
        Command::Encode { input, output, quality } => {
            let size = encode_file(&input, &output, quality)?;
            println!("{} -> {} ({size} bytes)", input.display(), output.display());
        }
        Command::Decode { input, output } => {
            decode_file(&input, &output)?;
            println!("{} -> {}", input.display(), output.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    fried::init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

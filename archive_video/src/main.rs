use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use archive_video::{run_batch, BatchSummary, FfmpegToolkit, Mode, Options, VideoCodec};
use shared_utils::logging::{init_logging, LogConfig};

/// sysexits.h EX_USAGE
const EX_USAGE: u8 = 64;
/// At least one file failed
const EX_FILE_FAILED: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "archivevideo")]
#[command(
    about = "Re-encode videos to space-saving Matroska files",
    long_about = "Given one or more input video files, re-encode them to Matroska files using\n\
relatively space-saving encoding parameters. The output file will be placed in\n\
the same directory as the input file, and the input file will be moved to a\n\
subdirectory \"Duplicates\" in the same directory as the input file.\n\
If an error occurs, a message will be printed for that file, and work will\n\
continue with the next file specified."
)]
struct Cli {
    /// Downmix audio to stereo, default is to reencode all channels
    #[arg(short = '2')]
    downmix: bool,

    /// Use x264 instead of x265 to encode video
    #[arg(short = '4')]
    x264: bool,

    /// Overwrite existing output files
    #[arg(short = 'f')]
    overwrite: bool,

    /// Print info on input files, instead of transcoding them
    #[arg(short = 'i')]
    info: bool,

    /// Don't run ffmpeg, just print what would be done
    #[arg(short = 'n')]
    dry_run: bool,

    /// Verbose information on progress
    #[arg(short = 'v')]
    verbose: bool,

    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            dry_run: self.dry_run,
            downmix: self.downmix,
            overwrite: self.overwrite,
            verbose: self.verbose,
            codec: if self.x264 {
                VideoCodec::X264
            } else {
                VideoCodec::X265
            },
        }
    }

    fn mode(&self) -> Mode {
        if self.info {
            Mode::Info
        } else {
            Mode::Transcode
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<BatchSummary> {
    let options = cli.options();
    let mode = cli.mode();
    info!(
        files = cli.files.len(),
        ?mode,
        codec = options.codec.as_str(),
        dry_run = options.dry_run,
        downmix = options.downmix,
        overwrite = options.overwrite,
        "Starting archivevideo"
    );

    let toolkit = FfmpegToolkit::locate();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = run_batch(&toolkit, &cli.files, mode, &options, &mut out);
    out.flush().context("Failed to flush stdout")?;

    info!(
        processed = summary.processed,
        failed = summary.failed,
        "Run finished"
    );
    Ok(summary)
}

/// Exit status for a command line clap refused: help is a success, anything
/// else is a usage error.
fn usage_exit_status(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp => 0,
        _ => EX_USAGE,
    }
}

fn batch_exit_status(summary: &BatchSummary) -> u8 {
    if summary.all_succeeded() {
        0
    } else {
        EX_FILE_FAILED
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_status(e.kind()));
        }
    };

    if let Err(e) = init_logging("archivevideo", LogConfig::for_cli(cli.verbose)) {
        eprintln!("warning: logging disabled: {:#}", e);
    }

    match run(&cli) {
        Ok(summary) => ExitCode::from(batch_exit_status(&summary)),
        Err(e) => {
            eprintln!("archivevideo: {:#}", e);
            ExitCode::from(EX_FILE_FAILED)
        }
    }
}

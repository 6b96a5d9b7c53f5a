//! Per-file workflows and the batch driver.
//!
//! A transcode runs `probe → validate → print command → encode → relocate`.
//! Any failure ends that file only: it is printed as one `error` line and the
//! batch moves on to the next file.
//!
//! Result lines (`info`, the tab-indented command, `error`) are written to the
//! caller's writer; diagnostics go through `tracing`.

use crate::encode_args::build_args;
use crate::metadata::MediaMetadata;
use crate::options::Options;
use crate::target::{duplicate_destination, duplicates_dir, target_filename};
use crate::toolkit::MediaToolkit;
use shared_utils::{is_same_file, ArchiveError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// What to do with each file on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Transcode,
    Info,
}

/// How a successful transcode ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// Command printed, nothing executed.
    DryRun { target: PathBuf },
    /// Target written and the source moved into `Duplicates`.
    Relocated { target: PathBuf, original: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

fn write_line(out: &mut dyn Write, line: std::fmt::Arguments<'_>) -> Result<()> {
    out.write_fmt(line)
        .and_then(|_| out.write_all(b"\n"))
        .map_err(|e| ArchiveError::io("writing output", e))
}

/// Probe `path` and print its summary line, preceded by the pretty-printed
/// probe document when verbose.
pub fn info(
    toolkit: &dyn MediaToolkit,
    path: &Path,
    options: &Options,
    out: &mut dyn Write,
) -> Result<MediaMetadata> {
    let meta = MediaMetadata::from_probe(toolkit.probe(path)?)?;
    if options.verbose {
        let pretty = serde_json::to_string_pretty(&meta.raw)
            .map_err(|e| ArchiveError::Probe(e.to_string()))?;
        write_line(out, format_args!("{}", pretty))?;
    }
    write_line(out, format_args!("{}", meta.info_line()))?;
    Ok(meta)
}

/// Re-encode `source` next to itself as `.mkv` and park the original in
/// `Duplicates/`.
pub fn transcode(
    toolkit: &dyn MediaToolkit,
    source: &Path,
    options: &Options,
    out: &mut dyn Write,
) -> Result<TranscodeOutcome> {
    let meta = MediaMetadata::from_probe(toolkit.probe(source)?)?;
    let target = target_filename(source)?;

    if is_same_file(source, &target) {
        return Err(ArchiveError::SameAsSource);
    }
    if target.exists() {
        if !options.overwrite {
            return Err(ArchiveError::TargetExists(target));
        }
        if options.dry_run {
            info!(target = %target.display(), "Dry run, existing target kept");
        } else {
            info!(target = %target.display(), "Removing existing target");
            fs::remove_file(&target).map_err(|e| {
                ArchiveError::io(format!("removing {}", target.display()), e)
            })?;
        }
    }

    let args = build_args(&meta, &target, options)?;
    write_line(
        out,
        format_args!("\t{}", args.command_line(toolkit.encoder_name())),
    )?;

    if options.dry_run {
        return Ok(TranscodeOutcome::DryRun { target });
    }

    if let Err(e) = toolkit.encode(&args, options.verbose) {
        remove_partial(&target);
        return Err(e);
    }

    let original = relocate_source(source, &target)?;
    Ok(TranscodeOutcome::Relocated { target, original })
}

fn remove_partial(target: &Path) {
    if !target.exists() {
        return;
    }
    match fs::remove_file(target) {
        Ok(()) => debug!(target = %target.display(), "Removed partial output"),
        Err(e) => warn!(target = %target.display(), error = %e, "Failed to remove partial output"),
    }
}

fn relocate_source(source: &Path, target: &Path) -> Result<PathBuf> {
    let dir = duplicates_dir(target);
    fs::create_dir_all(&dir)
        .map_err(|e| ArchiveError::io(format!("creating {}", dir.display()), e))?;

    let destination = duplicate_destination(source, target)?;
    // rename(2) would silently replace an earlier original
    if destination.exists() {
        warn!(
            from = %source.display(),
            to = %destination.display(),
            "Duplicates already holds a file of this name, original left in place"
        );
        return Err(ArchiveError::io(
            format!("moving original to {}", destination.display()),
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "destination already exists",
            ),
        ));
    }
    fs::rename(source, &destination).map_err(|e| {
        ArchiveError::io(
            format!("moving original to {}", destination.display()),
            e,
        )
    })?;
    debug!(from = %source.display(), to = %destination.display(), "Original relocated");
    Ok(destination)
}

/// Path an error line is reported against: the existing target for a
/// collision, the source otherwise.
pub fn report_path<'a>(source: &'a Path, err: &'a ArchiveError) -> &'a Path {
    match err {
        ArchiveError::TargetExists(target) => target,
        _ => source,
    }
}

/// Print the `error\t<path>\t<message>` line for one failed file.
pub fn report_failure(source: &Path, err: &ArchiveError, out: &mut dyn Write) {
    error!(
        file = %source.display(),
        category = ?err.category(),
        error = %err,
        "File failed"
    );
    let line = format!("error\t{}\t{}", report_path(source, err).display(), err);
    if let Err(e) = write_line(out, format_args!("{}", line)) {
        warn!(error = %e, "Could not write error line");
    }
}

/// Process every file in order; a failing file never stops the batch.
pub fn run_batch(
    toolkit: &dyn MediaToolkit,
    files: &[PathBuf],
    mode: Mode,
    options: &Options,
    out: &mut dyn Write,
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for file in files {
        summary.processed += 1;
        let result = match mode {
            Mode::Info => info(toolkit, file, options, out).map(|_| ()),
            Mode::Transcode => transcode(toolkit, file, options, out).map(|outcome| {
                match outcome {
                    TranscodeOutcome::DryRun { target } => {
                        debug!(file = %file.display(), target = %target.display(), "Dry run")
                    }
                    TranscodeOutcome::Relocated { target, original } => info!(
                        file = %file.display(),
                        target = %target.display(),
                        original = %original.display(),
                        "Transcoded"
                    ),
                }
            }),
        };
        if let Err(e) = result {
            summary.failed += 1;
            report_failure(file, &e, out);
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode_args::EncoderArgs;
    use crate::metadata::tests::probe_doc;
    use serde_json::json;
    use shared_utils::ErrorCategory;
    use std::cell::RefCell;
    use std::io;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum EncodeBehavior {
        /// Write the target and exit 0
        Succeed,
        /// Exit non-zero, optionally leaving a half-written target behind
        Fail { partial: bool },
    }

    /// Canned ffprobe answers and a recorded list of encoder invocations.
    struct MockToolkit {
        video: serde_json::Value,
        behavior: EncodeBehavior,
        encodes: RefCell<Vec<EncoderArgs>>,
    }

    impl MockToolkit {
        fn new(behavior: EncodeBehavior) -> Self {
            Self {
                video: json!({
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "display_aspect_ratio": "16:9",
                    "sample_aspect_ratio": "1:1",
                    "field_order": "progressive",
                    "r_frame_rate": "25/1"
                }),
                behavior,
                encodes: RefCell::new(Vec::new()),
            }
        }

        fn encode_count(&self) -> usize {
            self.encodes.borrow().len()
        }
    }

    impl MediaToolkit for MockToolkit {
        fn probe(&self, path: &Path) -> Result<serde_json::Value> {
            let name = path.to_string_lossy();
            if name.contains("broken") {
                return Err(ArchiveError::Probe("Invalid data found".into()));
            }
            if name.contains("audio-only") {
                return Ok(json!({
                    "format": {"filename": name},
                    "streams": [{"codec_type": "audio", "codec_name": "mp3", "channels": 2}]
                }));
            }
            Ok(probe_doc(&name, self.video.clone()))
        }

        fn encode(&self, args: &EncoderArgs, _verbose: bool) -> Result<()> {
            self.encodes.borrow_mut().push(args.clone());
            let target = PathBuf::from(args.as_slice().last().cloned().unwrap_or_default());
            match self.behavior {
                EncodeBehavior::Succeed => {
                    fs::write(&target, b"matroska").unwrap();
                    Ok(())
                }
                EncodeBehavior::Fail { partial } => {
                    if partial {
                        fs::write(&target, b"trunc").unwrap();
                    }
                    Err(ArchiveError::Encode(
                        "ffmpeg failed with exit status: 1: Conversion failed!".into(),
                    ))
                }
            }
        }
    }

    fn source(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"source").unwrap();
        path
    }

    fn output(out: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(out)
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_success_relocates_original() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        let mut out = Vec::new();

        let outcome = transcode(&toolkit, &src, &Options::default(), &mut out).unwrap();

        let target = dir.path().join("movie.mkv");
        let original = dir.path().join("Duplicates").join("movie.mp4");
        assert_eq!(
            outcome,
            TranscodeOutcome::Relocated {
                target: target.clone(),
                original: original.clone()
            }
        );
        assert!(target.is_file());
        assert!(original.is_file());
        assert!(!src.exists());

        let lines = output(&out);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("\tffmpeg -i "), "{}", lines[0]);
        assert!(lines[0].contains("-s 1280x720 -aspect 16:9"), "{}", lines[0]);
    }

    #[test]
    fn test_existing_duplicate_is_never_replaced() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let parked = dir.path().join("Duplicates").join("movie.mp4");
        fs::create_dir(dir.path().join("Duplicates")).unwrap();
        fs::write(&parked, b"first original").unwrap();
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        let options = Options {
            overwrite: true,
            ..Options::default()
        };
        let mut out = Vec::new();

        let summary = run_batch(&toolkit, &[src.clone()], Mode::Transcode, &options, &mut out);

        assert_eq!(summary.failed, 1);
        assert_eq!(fs::read(&parked).unwrap(), b"first original");
        assert!(src.is_file());
        // the finished encode is kept
        assert_eq!(fs::read(dir.path().join("movie.mkv")).unwrap(), b"matroska");
        let lines = output(&out);
        assert!(lines[1].starts_with(&format!("error\t{}\t", src.display())), "{}", lines[1]);
        assert!(lines[1].ends_with("destination already exists"), "{}", lines[1]);
    }

    #[test]
    fn test_existing_duplicates_dir_is_reused() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "a.avi");
        fs::create_dir(dir.path().join("Duplicates")).unwrap();
        fs::write(dir.path().join("Duplicates").join("other.avi"), b"x").unwrap();
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);

        transcode(&toolkit, &src, &Options::default(), &mut io::sink()).unwrap();

        assert!(dir.path().join("Duplicates").join("a.avi").is_file());
        assert!(dir.path().join("Duplicates").join("other.avi").is_file());
    }

    #[test]
    fn test_same_as_source_rejected() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "show.mkv");
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);

        let err = transcode(&toolkit, &src, &Options::default(), &mut io::sink()).unwrap_err();
        assert!(matches!(err, ArchiveError::SameAsSource));
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(toolkit.encode_count(), 0);
        assert!(src.is_file());
    }

    #[test]
    fn test_existing_target_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let target = dir.path().join("movie.mkv");
        fs::write(&target, b"previous run").unwrap();
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);

        let err = transcode(&toolkit, &src, &Options::default(), &mut io::sink()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(report_path(&src, &err), target.as_path());
        assert_eq!(toolkit.encode_count(), 0);
        assert_eq!(fs::read(&target).unwrap(), b"previous run");
    }

    #[test]
    fn test_second_run_hits_existing_target() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        transcode(&toolkit, &src, &Options::default(), &mut io::sink()).unwrap();

        // source restored by hand, as after a crash before relocation
        fs::write(&src, b"source").unwrap();
        let err = transcode(&toolkit, &src, &Options::default(), &mut io::sink()).unwrap_err();
        assert!(matches!(err, ArchiveError::TargetExists(_)));
    }

    #[test]
    fn test_overwrite_removes_existing_target() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let target = dir.path().join("movie.mkv");
        fs::write(&target, b"previous run").unwrap();
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        let options = Options {
            overwrite: true,
            ..Options::default()
        };

        transcode(&toolkit, &src, &options, &mut io::sink()).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"matroska");
        assert!(toolkit.encodes.borrow()[0].contains("-y"));
    }

    #[test]
    fn test_dry_run_mutates_nothing() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        let options = Options {
            dry_run: true,
            ..Options::default()
        };
        let mut out = Vec::new();

        let outcome = transcode(&toolkit, &src, &options, &mut out).unwrap();

        assert_eq!(
            outcome,
            TranscodeOutcome::DryRun {
                target: dir.path().join("movie.mkv")
            }
        );
        assert_eq!(toolkit.encode_count(), 0);
        assert!(src.is_file());
        assert!(!dir.path().join("movie.mkv").exists());
        assert!(!dir.path().join("Duplicates").exists());
        assert_eq!(output(&out).len(), 1);
    }

    #[test]
    fn test_dry_run_with_overwrite_keeps_existing_target() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let target = dir.path().join("movie.mkv");
        fs::write(&target, b"previous run").unwrap();
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        let options = Options {
            dry_run: true,
            overwrite: true,
            ..Options::default()
        };

        transcode(&toolkit, &src, &options, &mut io::sink()).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"previous run");
    }

    #[test]
    fn test_encode_failure_removes_partial_output() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let toolkit = MockToolkit::new(EncodeBehavior::Fail { partial: true });

        let err = transcode(&toolkit, &src, &Options::default(), &mut io::sink()).unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Encode);
        assert!(!dir.path().join("movie.mkv").exists());
        assert!(src.is_file());
        assert!(!dir.path().join("Duplicates").exists());
    }

    #[test]
    fn test_encode_failure_without_partial_output() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let toolkit = MockToolkit::new(EncodeBehavior::Fail { partial: false });

        let err = transcode(&toolkit, &src, &Options::default(), &mut io::sink()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Encode);
        assert!(src.is_file());
    }

    #[test]
    fn test_missing_video_stream() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "audio-only.mp3");
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);

        let err = transcode(&toolkit, &src, &Options::default(), &mut io::sink()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::MissingStream);
        assert_eq!(toolkit.encode_count(), 0);
    }

    #[test]
    fn test_probe_failure_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "broken.mp4");
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        let mut out = Vec::new();

        let err = transcode(&toolkit, &src, &Options::default(), &mut out).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Probe);
        assert!(out.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_batch_continues_after_failures() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            source(&dir, "broken.mp4"),
            source(&dir, "first.mp4"),
            source(&dir, "show.mkv"),
            source(&dir, "second.mov"),
        ];
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        let mut out = Vec::new();

        let summary = run_batch(&toolkit, &files, Mode::Transcode, &Options::default(), &mut out);

        assert_eq!(summary, BatchSummary { processed: 4, failed: 2 });
        assert!(!summary.all_succeeded());
        assert_eq!(toolkit.encode_count(), 2);

        let lines = output(&out);
        let errors: Vec<&String> = lines.iter().filter(|l| l.starts_with("error\t")).collect();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].ends_with("\tffprobe failed: Invalid data found"), "{}", errors[0]);
        assert!(errors[0].contains("broken.mp4"));
        assert!(errors[1].ends_with("show.mkv\ttarget is the same as source"), "{}", errors[1]);
        assert!(dir.path().join("Duplicates").join("first.mp4").is_file());
        assert!(dir.path().join("Duplicates").join("second.mov").is_file());
    }

    #[test]
    fn test_batch_encode_failure_line() {
        let dir = TempDir::new().unwrap();
        let files = vec![source(&dir, "movie.mp4"), source(&dir, "clip.avi")];
        let toolkit = MockToolkit::new(EncodeBehavior::Fail { partial: true });
        let mut out = Vec::new();

        let summary = run_batch(&toolkit, &files, Mode::Transcode, &Options::default(), &mut out);

        assert_eq!(summary.failed, 2);
        assert_eq!(toolkit.encode_count(), 2);
        let lines = output(&out);
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("error\t"));
        assert!(lines[1].ends_with("Conversion failed!"));
        assert!(files.iter().all(|f| f.is_file()));
    }

    #[test]
    fn test_already_exists_reported_against_target() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let target = dir.path().join("movie.mkv");
        fs::write(&target, b"x").unwrap();
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        let mut out = Vec::new();

        run_batch(&toolkit, &[src], Mode::Transcode, &Options::default(), &mut out);

        assert_eq!(
            output(&out),
            vec![format!("error\t{}\talready exists", target.display())]
        );
    }

    #[test]
    fn test_info_mode() {
        let dir = TempDir::new().unwrap();
        let files = vec![source(&dir, "movie.mp4"), source(&dir, "audio-only.mp3")];
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        let mut out = Vec::new();

        let summary = run_batch(&toolkit, &files, Mode::Info, &Options::default(), &mut out);

        assert!(summary.all_succeeded());
        assert_eq!(toolkit.encode_count(), 0);
        let lines = output(&out);
        assert_eq!(
            lines,
            vec![
                format!("info\t{}\th264/1080p25\taac,2", files[0].display()),
                format!("info\t{}\t\tmp3,2", files[1].display()),
            ]
        );
        assert!(files.iter().all(|f| f.is_file()));
    }

    #[test]
    fn test_verbose_info_dumps_probe_json() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, "movie.mp4");
        let toolkit = MockToolkit::new(EncodeBehavior::Succeed);
        let options = Options {
            verbose: true,
            ..Options::default()
        };
        let mut out = Vec::new();

        info(&toolkit, &src, &options, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("{\n"));
        assert!(text.contains("\"codec_name\": \"h264\""));
        assert!(text.trim_end().lines().last().unwrap().starts_with("info\t"));
    }
}

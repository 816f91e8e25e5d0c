use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgGroup, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::level_filters::LevelFilter;
use tracing::warn;

use scissors::demux::mime_type_for_extension;
use scissors::{
    AudioFormat, CancellationToken, EncodedSegment, Error, HttpTranscriber, Mp3Bitrate,
    NamingScheme, Opts, StaticTranscriber, Splitter, Transcriber,
};

#[tokio::main]
async fn main() -> Result<()> {
    scissors::logging::init_with_default(LevelFilter::WARN);
    let params = Params::parse();

    let opts = Opts {
        format: params.format,
        mp3_bitrate: Mp3Bitrate::from_kbps(params.bitrate_kbps)?,
        naming: NamingScheme::new(&params.prefix),
    };

    match (&params.boundaries_path, &params.transcriber_url) {
        (Some(path), _) => run(Splitter::new(load_boundaries(path)?, opts), &params).await,
        (None, Some(url)) => run(Splitter::new(HttpTranscriber::new(url)?, opts), &params).await,
        (None, None) => bail!("either --boundaries or --transcriber-url is required"),
    }
}

#[derive(Parser, Debug)]
#[command(name = "scissors")]
#[command(about = "Cut a recording into one audio clip per sentence")]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["boundaries_path", "transcriber_url"])
))]
#[command(group(
    ArgGroup::new("output")
        .required(true)
        .multiple(true)
        .args(["out_dir", "archive_path"])
))]
struct Params {
    /// Recording to split (any container Symphonia can read).
    #[arg(short = 'a', long = "audio")]
    audio_path: PathBuf,

    /// MIME type of the recording. Guessed from the file extension when omitted.
    #[arg(long = "mime-type")]
    mime_type: Option<String>,

    /// JSON array of `{text, start, end}` sentence boundaries.
    #[arg(short = 'b', long = "boundaries")]
    boundaries_path: Option<PathBuf>,

    /// Transcription endpoint that answers with sentence boundaries.
    #[arg(long = "transcriber-url")]
    transcriber_url: Option<String>,

    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        default_value_t = AudioFormat::Wav
    )]
    format: AudioFormat,

    /// MP3 bitrate in kbit/s. Ignored for WAV.
    #[arg(long = "bitrate", default_value_t = Mp3Bitrate::DEFAULT.kbps())]
    bitrate_kbps: u32,

    /// Write one file per sentence into this directory.
    #[arg(short = 'o', long = "out-dir")]
    out_dir: Option<PathBuf>,

    /// Write every clip into a single zip archive at this path.
    #[arg(long = "archive")]
    archive_path: Option<PathBuf>,

    /// File name prefix: clips are named `{prefix}-1.wav`, `{prefix}-2.wav`, ...
    #[arg(long = "prefix", default_value = "sentence")]
    prefix: String,
}

async fn run<T: Transcriber>(splitter: Splitter<T>, params: &Params) -> Result<()> {
    let audio = fs::read(&params.audio_path)
        .with_context(|| format!("failed to read {}", params.audio_path.display()))?;
    let mime_type = match &params.mime_type {
        Some(m) => m.clone(),
        None => guess_mime_type(&params.audio_path)?.to_owned(),
    };

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let pb = progress_bar()?;
    let result = splitter
        .split_with_progress(&audio, &mime_type, &cancel, |p| {
            pb.set_length(p.total as u64);
            pb.set_position(p.completed as u64);
        })
        .await;
    pb.finish_and_clear();

    let segments = match result {
        Ok(split) => split.segments,
        Err(Error::Cancelled { completed, partial }) => {
            warn!(completed, "cancelled; keeping finished clips");
            if let Some(dir) = &params.out_dir {
                write_segments(dir, &partial, &splitter.opts().naming)?;
            }
            bail!("cancelled after {completed} segment(s)");
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(dir) = &params.out_dir {
        write_segments(dir, &segments, &splitter.opts().naming)?;
    }

    if let Some(path) = &params.archive_path {
        let bytes = splitter.archive(&segments, params.format).await?;
        fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    }

    eprintln!("wrote {} clip(s)", segments.len());
    Ok(())
}

fn load_boundaries(path: &Path) -> Result<StaticTranscriber> {
    let transcriber = StaticTranscriber::from_json_file(path)
        .with_context(|| format!("failed to load boundaries from {}", path.display()))?;
    if transcriber.boundaries().is_empty() {
        bail!("{} contains no sentence boundaries", path.display());
    }
    Ok(transcriber)
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {pos}/{len} {bar:40.cyan/blue} {eta}")
            .map_err(|e| anyhow!("invalid progress template: {e}"))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn guess_mime_type(path: &Path) -> Result<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_type_for_extension)
        .ok_or_else(|| {
            anyhow!(
                "cannot guess the MIME type of {}; pass --mime-type",
                path.display()
            )
        })
}

fn write_segments(dir: &Path, segments: &[EncodedSegment], naming: &NamingScheme) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    for (i, segment) in segments.iter().enumerate() {
        let path = dir.join(segment.file_name(i, naming));
        fs::write(&path, &segment.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

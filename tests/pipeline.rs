use std::io::{Cursor, Read};

use scissors::batch::process_all;
use scissors::wav::encode_wav;
use scissors::{
    AudioBuffer, AudioFormat, CancellationToken, Error, NamingScheme, Opts, SegmentBoundary,
    Splitter, StaticTranscriber,
};

const RATE: u32 = 44_100;

/// A stereo tone with a distinct pitch per second, so slices are distinguishable.
fn stereo_tone(seconds: usize) -> AudioBuffer {
    let frames = RATE as usize * seconds;
    let left = (0..frames)
        .map(|i| {
            let second = (i / RATE as usize) as f32;
            let t = i as f32 / RATE as f32;
            0.4 * (2.0 * std::f32::consts::PI * (220.0 + 110.0 * second) * t).sin()
        })
        .collect();
    let right = vec![0.1; frames];
    AudioBuffer::new(RATE, vec![left, right]).expect("valid buffer")
}

fn boundaries(ranges: &[(f64, f64)]) -> Vec<SegmentBoundary> {
    ranges
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| SegmentBoundary::new(format!("Sentence {i}."), start, end))
        .collect()
}

#[tokio::test]
async fn wav_segments_parse_with_an_independent_reader() -> anyhow::Result<()> {
    let source = stereo_tone(7);
    let segments = process_all(
        &source,
        &boundaries(&[(0.0, 1.0), (2.0, 3.0), (5.0, 6.0)]),
        &Opts::default(),
        &CancellationToken::new(),
    )
    .await?;

    assert_eq!(segments.len(), 3);
    for (i, segment) in segments.iter().enumerate() {
        assert_eq!(segment.boundary.text, format!("Sentence {i}."));
        assert_eq!(segment.format, AudioFormat::Wav);

        let reader = hound::WavReader::new(Cursor::new(&segment.bytes))?;
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(reader.duration(), RATE);
    }

    // The constant right channel survives quantization on every frame.
    let reader = hound::WavReader::new(Cursor::new(&segments[1].bytes))?;
    let samples = reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    let expected_right = (0.1f32 * 32767.0) as i16;
    assert!(samples.iter().skip(1).step_by(2).all(|&s| s == expected_right));
    Ok(())
}

#[tokio::test]
async fn splitter_writes_mp3_zip_in_boundary_order() -> anyhow::Result<()> {
    let wav = encode_wav(&stereo_tone(4));
    let opts = Opts {
        naming: NamingScheme::new("take"),
        ..Opts::default().with_format(AudioFormat::Mp3)
    };
    let splitter = Splitter::new(
        StaticTranscriber::new(boundaries(&[(0.0, 1.0), (1.0, 2.5), (2.5, 4.0)])),
        opts,
    );

    let split = splitter
        .split(&wav, "audio/wav", &CancellationToken::new())
        .await?;
    let zip_bytes = splitter.archive(&split.segments, AudioFormat::Mp3).await?;

    let mut archive = zip::ZipArchive::new(Cursor::new(zip_bytes))?;
    let names: Vec<String> = archive.file_names().map(str::to_owned).collect();
    assert_eq!(names, ["take-1.mp3", "take-2.mp3", "take-3.mp3"]);

    for (i, segment) in split.segments.iter().enumerate() {
        let mut stored = Vec::new();
        archive.by_index(i)?.read_to_end(&mut stored)?;
        assert_eq!(stored, segment.bytes);
    }
    Ok(())
}

#[tokio::test]
async fn clips_can_be_written_to_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let source = stereo_tone(2);
    let naming = NamingScheme::default();

    let segments = process_all(
        &source,
        &boundaries(&[(0.0, 0.5), (0.5, 2.0)]),
        &Opts::default(),
        &CancellationToken::new(),
    )
    .await?;
    for (i, segment) in segments.iter().enumerate() {
        std::fs::write(dir.path().join(segment.file_name(i, &naming)), &segment.bytes)?;
    }

    let second = hound::WavReader::open(dir.path().join("sentence-2.wav"))?;
    assert_eq!(second.duration(), RATE + RATE / 2);
    assert!(dir.path().join("sentence-1.wav").exists());
    Ok(())
}

#[tokio::test]
async fn cancelled_token_stops_the_split() -> anyhow::Result<()> {
    let wav = encode_wav(&stereo_tone(1));
    let splitter = Splitter::new(
        StaticTranscriber::new(boundaries(&[(0.0, 0.5), (0.5, 1.0)])),
        Opts::default(),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    match splitter.split(&wav, "audio/wav", &cancel).await {
        Err(Error::Cancelled { completed, partial }) => {
            assert_eq!(completed, 0);
            assert!(partial.is_empty());
        }
        other => anyhow::bail!("expected cancellation, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn degenerate_boundaries_still_yield_a_clip() -> anyhow::Result<()> {
    let wav = encode_wav(&stereo_tone(1));
    let splitter = Splitter::new(
        StaticTranscriber::new(boundaries(&[(0.8, 0.2), (5.0, 5.0)])),
        Opts::default(),
    );

    let split = splitter
        .split(&wav, "audio/wav", &CancellationToken::new())
        .await?;
    for segment in &split.segments {
        let reader = hound::WavReader::new(Cursor::new(&segment.bytes))?;
        assert_eq!(reader.duration(), 1);
    }
    Ok(())
}

use scissors::decoder::{decode, decode_with_hint};
use scissors::mp3::encode_mp3;
use scissors::wav::encode_wav;
use scissors::{AudioBuffer, Error, Mp3Bitrate};

fn tone(rate: u32, channels: usize, frames: usize) -> AudioBuffer {
    let channels = (0..channels)
        .map(|c| {
            (0..frames)
                .map(|i| 0.5 * ((i + c * 7) as f32 * 0.01).sin())
                .collect()
        })
        .collect();
    AudioBuffer::new(rate, channels).expect("valid buffer")
}

#[test]
fn wav_round_trips_within_quantization_error() -> anyhow::Result<()> {
    let original = tone(22_050, 2, 5_000);
    let decoded = decode(&encode_wav(&original))?;

    assert_eq!(decoded.sample_rate(), 22_050);
    assert_eq!(decoded.channel_count(), 2);
    assert_eq!(decoded.frame_count(), 5_000);

    for (a, b) in original.channels().iter().zip(decoded.channels()) {
        let max_err = a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y).abs())
            .fold(0.0f32, f32::max);
        assert!(max_err < 1e-3, "max error {max_err}");
    }
    Ok(())
}

#[test]
fn mp3_output_decodes_with_symphonia() -> anyhow::Result<()> {
    let original = tone(44_100, 2, 44_100);
    let mp3 = encode_mp3(&original, Mp3Bitrate::from_kbps(192)?)?;

    let decoded = decode_with_hint(&mp3, Some("audio/mpeg"))?;
    assert_eq!(decoded.sample_rate(), 44_100);
    assert_eq!(decoded.channel_count(), 2);

    // Encoder delay and padding add frames; they never remove a whole second.
    assert!(decoded.frame_count() >= 44_100);
    assert!(decoded.frame_count() < 44_100 + 6 * 1152);
    Ok(())
}

#[test]
fn mono_mp3_decodes_as_mono() -> anyhow::Result<()> {
    let mp3 = encode_mp3(&tone(48_000, 1, 10_000), Mp3Bitrate::DEFAULT)?;
    let decoded = decode(&mp3)?;
    assert_eq!(decoded.channel_count(), 1);
    assert_eq!(decoded.sample_rate(), 48_000);
    Ok(())
}

#[test]
fn rejects_empty_and_garbage_input() {
    assert!(matches!(decode(&[]), Err(Error::Decode(_))));
    assert!(matches!(
        decode(b"this is a text file, not a recording"),
        Err(Error::Decode(_))
    ));
}

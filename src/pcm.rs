//! `f32` → signed 16-bit PCM quantization shared by the WAV and MP3 encoders.

/// Quantize one sample to `i16`.
///
/// The sample is clamped to `[-1.0, 1.0]`, then negative values are scaled by 32768 and
/// non-negative values by 32767, and the product is truncated toward zero. The asymmetric
/// scale keeps the full negative range without overflowing on the positive side.
/// NaN quantizes to 0.
#[inline]
pub fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32_768.0) as i16
    } else {
        (s * 32_767.0) as i16
    }
}

/// Quantize a whole channel.
pub fn quantize_channel(samples: &[f32]) -> Vec<i16> {
    samples.iter().copied().map(quantize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_values() {
        assert_eq!(quantize(1.0), 32_767);
        assert_eq!(quantize(-1.0), -32_768);
        assert_eq!(quantize(2.0), 32_767);
        assert_eq!(quantize(-2.0), -32_768);
        assert_eq!(quantize(0.0), 0);
    }

    #[test]
    fn truncates_toward_zero() {
        // 0.5 * 32767 = 16383.5
        assert_eq!(quantize(0.5), 16_383);
        // -0.5 * 32768 = -16384 exactly
        assert_eq!(quantize(-0.5), -16_384);
        // Tiny magnitudes collapse to zero on both sides.
        assert_eq!(quantize(1.0e-6), 0);
        assert_eq!(quantize(-1.0e-6), 0);
    }

    #[test]
    fn non_finite_inputs_do_not_panic() {
        assert_eq!(quantize(f32::NAN), 0);
        assert_eq!(quantize(f32::INFINITY), 32_767);
        assert_eq!(quantize(f32::NEG_INFINITY), -32_768);
    }

    #[test]
    fn quantize_channel_maps_every_sample() {
        assert_eq!(quantize_channel(&[0.0, 1.0, -1.0]), vec![0, 32_767, -32_768]);
    }
}

//! Sample-to-level conversion for the 8-bit DAC.

/// Map a signed 16-bit sample onto the DAC's unsigned 8-bit range.
///
/// Linear with rounding: `i16::MIN` maps to 0, `i16::MAX` to 255, and zero
/// to the 128 midpoint. Total and monotonic over the whole input range.
pub fn map_sample(input: i16) -> u8 {
    let shifted = (i32::from(input) - i32::from(i16::MIN)) as u32;
    ((shifted * 255 + 32_767) / 65_535) as u8
}

/// Down-mix one interleaved frame to a single sample.
///
/// Uses the first channel only. The original player declared an average over
/// all channels but its channel loop only ever visited channel zero, so this
/// is the behavior stereo material has always produced on the device; see
/// DESIGN.md.
pub fn first_channel(frame: &[i16]) -> i16 {
    frame.first().copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(map_sample(i16::MIN), 0);
        assert_eq!(map_sample(i16::MAX), 255);
    }

    #[test]
    fn test_zero_maps_to_midpoint() {
        assert_eq!(map_sample(0), 128);
    }

    #[test]
    fn test_first_channel() {
        assert_eq!(first_channel(&[100, -200]), 100);
        assert_eq!(first_channel(&[-5]), -5);
        assert_eq!(first_channel(&[]), 0);
    }

    proptest! {
        #[test]
        fn prop_monotonic(a in i16::MIN..i16::MAX) {
            prop_assert!(map_sample(a) <= map_sample(a + 1));
        }

        #[test]
        fn prop_total(v in any::<i16>()) {
            // Never panics; output always representable.
            let _ = map_sample(v);
        }
    }
}

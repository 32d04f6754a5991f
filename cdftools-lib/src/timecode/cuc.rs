use hifitime::{Duration, Epoch};

use super::{be_uint, DecodedTime, Format, Result, SubSecond, CCSDS_HIFIEPOCH_DELTA_SECS};

/// Decode a CCSDS Level-1 Unsegmented Time Code.
///
/// The coarse time is the number of TAI seconds since Jan 1, 1958 and the fine time is a binary
/// fraction of a second, i.e., `fine / 256^num_fine`. The fraction is rounded to the nearest
/// microsecond for the timestamp; the exact value is kept in [DecodedTime::sub_second].
///
/// `buf` must already have been checked to contain exactly `num_coarse + num_fine` bytes.
pub(super) fn decode(num_coarse: usize, num_fine: usize, buf: &[u8]) -> Result<DecodedTime> {
    let (coarse, fine) = buf.split_at(num_coarse);
    let seconds = be_uint(coarse);
    let sub_second = SubSecond {
        numerator: be_uint(&fine[..num_fine]),
        denominator: 1u64 << (8 * num_fine),
    };

    let micros = sub_second.rounded_micros();
    let elapsed = Duration::compose(0, 0, 0, 0, seconds, 0, micros, 0);
    let epoch = Epoch::from_tai_duration(Duration::compose(
        0,
        0,
        0,
        0,
        CCSDS_HIFIEPOCH_DELTA_SECS,
        0,
        0,
        0,
    ));

    Ok(DecodedTime {
        format: Format::Cuc {
            num_coarse,
            num_fine,
        },
        elapsed: Some(elapsed),
        epoch: Some(epoch),
        timestamp: Some(epoch + elapsed),
        sub_second,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fine_time_is_binary_fraction() {
        // 1 second and half a second
        let tc = decode(1, 1, &[0x01, 0x80]).unwrap();

        assert_eq!(tc.sub_second, SubSecond::new(128, 256));
        let (y, m, d, hh, mm, ss, ns) = tc.timestamp.unwrap().to_gregorian_tai();
        assert_eq!((y, m, d, hh, mm, ss, ns), (1958, 1, 1, 0, 0, 1, 500_000_000));
    }

    #[test]
    fn three_fine_bytes_round_to_micros() {
        // 0x000001 / 2^24 is ~59.6ns, rounds away
        let tc = decode(1, 3, &[0x00, 0x00, 0x00, 0x01]).unwrap();

        assert!(tc.precision_loss());
        let (.., ns) = tc.timestamp.unwrap().to_gregorian_tai();
        assert_eq!(ns, 0);
    }
}

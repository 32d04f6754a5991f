use hifitime::{Duration, Epoch};

use super::{be_uint, DecodedTime, Format, Result, SubSecond, CCSDS_HIFIEPOCH_DELTA_SECS};

const MILLIS_PER_DAY: u64 = 86_400_000;

/// Decode a CCSDS Day-Segmented Time Code.
///
/// `num_day` is the number of bytes of the day segment, 2 or 3. The millisecond of day is always
/// 4 bytes. `num_submillis` is 0, 2 for microseconds of the millisecond, or 4 for picoseconds of
/// the millisecond.
///
/// When `agency_epoch` is set the day count is relative to `epoch` which must be supplied by the
/// caller. Without it the result has no [DecodedTime::timestamp]; use [DecodedTime::with_epoch]
/// once the mission epoch is known.
///
/// Reference: [CCSDS Time Code Formats 301.0-B-4](https://public.ccsds.org/Pubs/301x0b4e1.pdf)
/// Section 3.3.
pub(super) fn decode(
    num_day: usize,
    num_submillis: usize,
    agency_epoch: bool,
    epoch: Option<Epoch>,
    buf: &[u8],
) -> Result<DecodedTime> {
    let (days, rest) = buf.split_at(num_day);
    let (millis, submillis) = rest.split_at(4);
    let days = be_uint(days);
    let millis = be_uint(millis);
    let submillis = be_uint(&submillis[..num_submillis]);

    if millis >= MILLIS_PER_DAY {
        return Err(super::Error::InvalidCalendar(format!(
            "CDS millisecond of day {millis} out of range"
        )));
    }

    // units of the sub-millisecond field per millisecond
    let units: u64 = match num_submillis {
        0 => 1,
        2 => 1_000,
        _ => 1_000_000_000,
    };
    if num_submillis > 0 && submillis >= units {
        return Err(super::Error::InvalidCalendar(format!(
            "CDS sub-millisecond value {submillis} out of range"
        )));
    }
    let remainder = millis % 1000;
    let sub_second = SubSecond {
        numerator: remainder * units + submillis,
        denominator: 1000 * units,
    };
    let micros = match num_submillis {
        0 => remainder * 1000,
        2 => remainder * 1000 + submillis,
        _ => remainder * 1000 + submillis / 1_000_000,
    };

    let elapsed = Duration::compose(0, days, 0, 0, millis / 1000, 0, micros, 0);
    let epoch = if agency_epoch {
        epoch
    } else {
        Some(Epoch::from_utc_duration(Duration::compose(
            0,
            0,
            0,
            0,
            CCSDS_HIFIEPOCH_DELTA_SECS,
            0,
            0,
            0,
        )))
    };

    Ok(DecodedTime {
        format: Format::Cds {
            num_day,
            num_submillis,
            agency_epoch,
        },
        elapsed: Some(elapsed),
        epoch,
        timestamp: epoch.map(|epoch| utc_offset(epoch, elapsed)),
        sub_second,
    })
}

/// Day segmented codes count UTC days, so the offset is applied on the UTC scale.
pub(super) fn utc_offset(epoch: Epoch, elapsed: Duration) -> Epoch {
    Epoch::from_utc_duration(epoch.to_utc_duration() + elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micro_submillis() {
        let buf = [0x5f, 0x5b, 0x00, 0x00, 0x06, 0x94, 0x02, 0x07];
        let tc = decode(2, 2, false, None, &buf).unwrap();

        let (y, m, d, hh, mm, ss, ns) = tc.timestamp.unwrap().to_gregorian_utc();
        assert_eq!((y, m, d, hh, mm, ss, ns), (2024, 11, 1, 0, 0, 1, 684_519_000));
        assert!(!tc.precision_loss());
    }

    #[test]
    fn pico_submillis_are_truncated() {
        // 1ms + 123_456_789ps
        let buf = [0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x07, 0x5b, 0xcd, 0x15];
        let tc = decode(2, 4, false, None, &buf).unwrap();

        assert_eq!(tc.sub_second, SubSecond::new(1_123_456_789, 1_000_000_000_000));
        assert!(tc.precision_loss());
        let (.., ns) = tc.timestamp.unwrap().to_gregorian_utc();
        assert_eq!(ns, 1_123_000);
    }

    #[test]
    fn agency_epoch_without_epoch_has_no_timestamp() {
        let buf = [0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
        let tc = decode(2, 0, true, None, &buf).unwrap();

        assert!(tc.timestamp.is_none());
        let tc = tc.with_epoch(Epoch::from_gregorian_utc_at_midnight(2000, 1, 1));
        let (y, m, d, ..) = tc.timestamp.unwrap().to_gregorian_utc();
        assert_eq!((y, m, d), (2000, 1, 2));
    }

    #[test]
    fn submillis_out_of_range() {
        // 1000us is a full millisecond
        let buf = [0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x03, 0xe8];
        assert!(matches!(
            decode(2, 2, false, None, &buf),
            Err(super::super::Error::InvalidCalendar(_))
        ));
    }

    #[test]
    fn millis_out_of_range() {
        let buf = [0x00, 0x01, 0xff, 0xff, 0xff, 0xff];
        assert!(matches!(
            decode(2, 0, false, None, &buf),
            Err(super::super::Error::InvalidCalendar(_))
        ));
    }

    #[test]
    fn leap_second_millis_rejected() {
        // 86_400_500ms lands in a 61st second of the last minute
        let buf = [0x00, 0x01, 0x05, 0x26, 0x5d, 0xf4];
        assert!(matches!(
            decode(2, 0, false, None, &buf),
            Err(super::super::Error::InvalidCalendar(_))
        ));
        let buf = [0x00, 0x01, 0x05, 0x26, 0x5b, 0xff];
        assert!(decode(2, 0, false, None, &buf).is_ok());
    }
}

use hifitime::Epoch;

use super::{be_uint, DecodedTime, Error, Format, Result, SubSecond};

/// Decode a CCSDS Calendar Segmented Time Code.
///
/// Fields are binary counts, year on 2 bytes followed by either month and day of month, or
/// the 2 byte day of year when `day_of_year` is set, then hour, minute and second. Each of the
/// `resolution` trailing bytes counts hundredths of the previous unit, i.e., the first is
/// 10^-2 seconds, the second 10^-4 seconds, and so on.
pub(super) fn decode(resolution: usize, day_of_year: bool, buf: &[u8]) -> Result<DecodedTime> {
    let year = be_uint(&buf[..2]);
    let (month, day) = if day_of_year {
        month_day_from_ordinal(year, be_uint(&buf[2..4]))?
    } else {
        (u64::from(buf[2]), u64::from(buf[3]))
    };
    let (hour, minute, second) = (buf[4], buf[5], buf[6]);

    let mut numerator = 0u64;
    let mut denominator = 1u64;
    for (idx, digits) in buf[7..7 + resolution].iter().enumerate() {
        if *digits > 99 {
            return Err(Error::InvalidCalendar(format!(
                "sub-second byte {idx} has value {digits}; must be < 100"
            )));
        }
        numerator = numerator * 100 + u64::from(*digits);
        denominator *= 100;
    }
    let sub_second = SubSecond {
        numerator,
        denominator,
    };

    let (Ok(year), Ok(month), Ok(day)) = (i32::try_from(year), u8::try_from(month), u8::try_from(day))
    else {
        return Err(Error::InvalidCalendar(format!(
            "date {year}-{month}-{day} out of range"
        )));
    };
    let nanos = u32::try_from(sub_second.truncated_micros() * 1000)
        .map_err(|_| Error::InvalidCalendar("sub-second overflow".to_string()))?;
    let timestamp =
        Epoch::maybe_from_gregorian_utc(year, month, day, hour, minute, second, nanos).map_err(
            |err| {
                Error::InvalidCalendar(format!(
                    "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}: {err}"
                ))
            },
        )?;

    Ok(DecodedTime {
        format: Format::Ccs {
            resolution,
            day_of_year,
        },
        elapsed: None,
        epoch: None,
        timestamp: Some(timestamp),
        sub_second,
    })
}

fn is_leap_year(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Convert a 1-based day of year to a month and day of month.
fn month_day_from_ordinal(year: u64, ordinal: u64) -> Result<(u64, u64)> {
    let mut lengths = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if is_leap_year(year) {
        lengths[1] = 29;
    }
    let mut remaining = ordinal;
    if remaining == 0 {
        return Err(Error::InvalidCalendar("day of year 0".to_string()));
    }
    for (month, len) in lengths.iter().enumerate() {
        if remaining <= *len {
            return Ok((month as u64 + 1, remaining));
        }
        remaining -= len;
    }
    Err(Error::InvalidCalendar(format!(
        "day of year {ordinal} out of range for {year}"
    )))
}

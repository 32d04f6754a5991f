//! CCSDS time code decoding.
//!
//! A time code is described by its preamble, or p-field, and the time field, or t-field, that
//! holds the encoded time. The p-field selects one of the CCSDS formats:
//!
//! |id|Format|Supported|
//! |---|---|---|
//! |1|CUC level 1, epoch Jan 1, 1958 TAI|yes|
//! |2|CUC level 2, agency-defined epoch|no|
//! |4|CDS, epoch Jan 1, 1958 or agency-defined|yes|
//! |5|CCS|yes|
//! |6|Agency-defined|no|
//!
//! Reference: [CCSDS Time Code Formats 301.0-B-4](https://public.ccsds.org/Pubs/301x0b4e1.pdf)
//!
//! # Example
//! ```
//! use cdftools::timecode::{decode, TimeScale};
//!
//! let tc = decode(0b0011_0010, &[0x72, 0x7d, 0x61, 0x54], None).unwrap();
//! assert_eq!(tc.time_scale(), TimeScale::Tai);
//! assert_eq!(tc.name(), "CUC");
//! ```
mod ccs;
mod cds;
mod cuc;
mod error;

pub use error::{Error, Result};

use hifitime::{Duration, Epoch};
use serde::Serialize;
use tracing::debug;

/// Number of seconds between the 1900 hifitime reference and the 1958 CCSDS epoch
const CCSDS_HIFIEPOCH_DELTA_SECS: u64 = 1_830_297_600;

/// Time scale of a decoded time code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TimeScale {
    Tai,
    Utc,
}

/// Epoch a time code is relative to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EpochType {
    /// The CCSDS recommended epoch of Jan 1, 1958
    Ccsds,
    /// Epoch defined by the mission; must be supplied by the caller
    AgencyDefined,
    /// The time code is an absolute calendar date
    NotApplicable,
}

/// CCSDS time code format configuration as described by a p-field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum Format {
    /// Unsegmented time code.
    ///
    /// `num_coarse` is between 1 and 4, `num_fine` between 0 and 3.
    Cuc { num_coarse: usize, num_fine: usize },
    /// Day segmented time code.
    ///
    /// Valid combinations are:
    /// |`num_day`|`num_submillis`| |
    /// |---|---|---|
    /// |2 or 3|0|No sub-milliseconds|
    /// |2 or 3|2|Microsecond resolution|
    /// |2 or 3|4|Picosecond resolution|
    Cds {
        num_day: usize,
        num_submillis: usize,
        agency_epoch: bool,
    },
    /// Calendar segmented time code.
    ///
    /// `resolution` is the number of sub-second bytes, 0 to 6.
    Ccs {
        resolution: usize,
        day_of_year: bool,
    },
}

impl Format {
    /// Classify a p-field. Only the low byte of `p_field` is considered.
    ///
    /// # Errors
    /// [Error::UnsupportedFormat] for CUC level 2, agency-defined codes and reserved field values,
    /// or [Error::InvalidTimeCode] for an unknown time code id.
    pub fn from_pfield(p_field: u16) -> Result<Format> {
        let p = p_field & 0xff;
        let id = ((p & 0x0e) >> 1) as u8;
        let format = match id {
            1 => Format::Cuc {
                num_coarse: usize::from((p & 0x30) >> 4) + 1,
                num_fine: usize::from((p & 0xc0) >> 6),
            },
            2 => {
                return Err(Error::UnsupportedFormat(
                    "CUC level 2 requires an agency-defined epoch".to_string(),
                ))
            }
            4 => {
                let num_submillis = usize::from((p & 0xc0) >> 5);
                if num_submillis > 4 {
                    return Err(Error::UnsupportedFormat(format!(
                        "CDS sub-millisecond code in p-field {p_field:#04x} is reserved"
                    )));
                }
                Format::Cds {
                    num_day: usize::from((p & 0x20) >> 5) + 2,
                    num_submillis,
                    agency_epoch: p & 0x10 != 0,
                }
            }
            5 => {
                let resolution = usize::from((p & 0xe0) >> 5);
                if resolution == 7 {
                    return Err(Error::UnsupportedFormat(format!(
                        "CCS resolution in p-field {p_field:#04x} is reserved"
                    )));
                }
                Format::Ccs {
                    resolution,
                    day_of_year: p & 0x10 != 0,
                }
            }
            6 => {
                return Err(Error::UnsupportedFormat(
                    "agency-defined time code".to_string(),
                ))
            }
            _ => return Err(Error::InvalidTimeCode { pfield: p_field, id }),
        };
        debug!(?format, "classified p-field {p_field:#04x}");
        Ok(format)
    }

    /// Short CCSDS name of the format, e.g., "CUC".
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Format::Cuc { .. } => "CUC",
            Format::Cds { .. } => "CDS",
            Format::Ccs { .. } => "CCS",
        }
    }

    /// CCSDS level; level 2 codes use an agency-defined epoch.
    #[must_use]
    pub fn level(&self) -> u8 {
        match self {
            Format::Cds {
                agency_epoch: true, ..
            } => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub fn epoch_type(&self) -> EpochType {
        match self {
            Format::Cuc { .. } => EpochType::Ccsds,
            Format::Cds { agency_epoch, .. } => {
                if *agency_epoch {
                    EpochType::AgencyDefined
                } else {
                    EpochType::Ccsds
                }
            }
            Format::Ccs { .. } => EpochType::NotApplicable,
        }
    }

    #[must_use]
    pub fn time_scale(&self) -> TimeScale {
        match self {
            Format::Cuc { .. } => TimeScale::Tai,
            _ => TimeScale::Utc,
        }
    }

    /// Number of t-field bytes required by this format.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Format::Cuc {
                num_coarse,
                num_fine,
            } => num_coarse + num_fine,
            Format::Cds {
                num_day,
                num_submillis,
                ..
            } => num_day + 4 + num_submillis,
            Format::Ccs { resolution, .. } => 7 + resolution,
        }
    }
}

/// Exact sub-second portion of a time code as `numerator / denominator` seconds.
///
/// Timestamps only carry microseconds. Use this when the full resolution of the time code
/// matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SubSecond {
    pub numerator: u64,
    pub denominator: u64,
}

impl SubSecond {
    #[must_use]
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    fn scaled(&self, unit: u128) -> u128 {
        u128::from(self.numerator) * unit / u128::from(self.denominator)
    }

    /// Microseconds, truncated.
    #[must_use]
    pub fn truncated_micros(&self) -> u64 {
        self.scaled(1_000_000) as u64
    }

    /// Microseconds, rounded half up.
    #[must_use]
    pub fn rounded_micros(&self) -> u64 {
        let den = u128::from(self.denominator);
        ((u128::from(self.numerator) * 1_000_000 + den / 2) / den) as u64
    }

    /// Nanoseconds, truncated.
    #[must_use]
    pub fn nanos(&self) -> u64 {
        self.scaled(1_000_000_000) as u64
    }

    /// True if the value is not a whole number of microseconds.
    #[must_use]
    pub fn is_sub_micro(&self) -> bool {
        u128::from(self.numerator) * 1_000_000 % u128::from(self.denominator) != 0
    }

    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// A decoded time code.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedTime {
    /// Format classified from the p-field.
    pub format: Format,
    /// Time since [DecodedTime::epoch], at microsecond resolution. `None` for CCS.
    pub elapsed: Option<Duration>,
    /// Epoch the code is relative to. `None` for CCS and for agency-defined epochs that
    /// were not provided.
    pub epoch: Option<Epoch>,
    /// Decoded time at microsecond resolution. `None` when the epoch is unknown.
    pub timestamp: Option<Epoch>,
    /// Exact sub-second value.
    pub sub_second: SubSecond,
}

impl DecodedTime {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.format.name()
    }

    #[must_use]
    pub fn level(&self) -> u8 {
        self.format.level()
    }

    #[must_use]
    pub fn epoch_type(&self) -> EpochType {
        self.format.epoch_type()
    }

    #[must_use]
    pub fn time_scale(&self) -> TimeScale {
        self.format.time_scale()
    }

    /// True if the timestamp dropped sub-microsecond precision.
    #[must_use]
    pub fn precision_loss(&self) -> bool {
        self.sub_second.is_sub_micro()
    }

    /// Resolve an agency-defined epoch. Time codes with a fixed epoch are returned unchanged.
    #[must_use]
    pub fn with_epoch(mut self, epoch: Epoch) -> Self {
        if self.epoch_type() != EpochType::AgencyDefined {
            return self;
        }
        if let Some(elapsed) = self.elapsed {
            self.timestamp = Some(cds::utc_offset(epoch, elapsed));
        }
        self.epoch = Some(epoch);
        self
    }
}

/// Decode a CCSDS time code from its p-field and t-field.
///
/// `epoch` is only used for CDS level 2 codes that count days from an agency-defined epoch.
/// If it is not provided for such a code the result has no timestamp and it is up to the
/// caller to resolve it with [DecodedTime::with_epoch].
///
/// # Errors
/// [Error::UnsupportedFormat] or [Error::InvalidTimeCode] if the p-field cannot be
/// decoded, [Error::FieldLengthMismatch] if `t_field` does not have the length declared by
/// the p-field, or [Error::InvalidCalendar] for out of range CCS fields.
pub fn decode(p_field: u16, t_field: &[u8], epoch: Option<Epoch>) -> Result<DecodedTime> {
    let format = Format::from_pfield(p_field)?;
    decode_format(&format, t_field, epoch)
}

/// Decode `t_field` using an already classified [Format].
///
/// # Errors
/// See [decode].
pub fn decode_format(format: &Format, t_field: &[u8], epoch: Option<Epoch>) -> Result<DecodedTime> {
    if t_field.len() != format.len() {
        return Err(Error::FieldLengthMismatch {
            expected: format.len(),
            actual: t_field.len(),
        });
    }
    match *format {
        Format::Cuc {
            num_coarse,
            num_fine,
        } => cuc::decode(num_coarse, num_fine, t_field),
        Format::Cds {
            num_day,
            num_submillis,
            agency_epoch,
        } => cds::decode(num_day, num_submillis, agency_epoch, epoch, t_field),
        Format::Ccs {
            resolution,
            day_of_year,
        } => ccs::decode(resolution, day_of_year, t_field),
    }
}

/// Big-endian unsigned integer from up to 8 bytes.
fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn cuc() {
        let tc = decode(0b0011_0010, &[0x72, 0x7d, 0x61, 0x54], None).unwrap();

        assert_eq!(
            tc.format,
            Format::Cuc {
                num_coarse: 4,
                num_fine: 0
            }
        );
        assert_eq!(tc.time_scale(), TimeScale::Tai);
        assert_eq!(tc.epoch_type(), EpochType::Ccsds);
        assert_eq!(tc.level(), 1);
        let (y, m, d, ..) = tc.epoch.unwrap().to_gregorian_tai();
        assert_eq!((y, m, d), (1958, 1, 1));
        let (y, m, d, hh, mm, ss, ns) = tc.timestamp.unwrap().to_gregorian_tai();
        assert_eq!((y, m, d, hh, mm, ss, ns), (2018, 11, 13, 16, 59, 0, 0));
        assert_eq!(tc.elapsed.unwrap().to_seconds().round() as u64, 1_920_819_540);
    }

    #[test]
    fn cds() {
        let buf = hex::decode("56d703a4ec90").unwrap();
        let tc = decode(0b0000_1000, &buf, None).unwrap();

        assert_eq!(
            tc.format,
            Format::Cds {
                num_day: 2,
                num_submillis: 0,
                agency_epoch: false,
            }
        );
        assert_eq!(tc.time_scale(), TimeScale::Utc);
        assert_eq!(tc.epoch_type(), EpochType::Ccsds);
        let (y, m, d, hh, mm, ss, ns) = tc.timestamp.unwrap().to_gregorian_utc();
        assert_eq!((y, m, d, hh, mm, ss, ns), (2018, 11, 13, 16, 59, 0, 112_000_000));
    }

    #[test]
    fn ccs() {
        let buf = hex::decode("07e20b0d103b000b1621").unwrap();
        let tc = decode(0b0110_1010, &buf, None).unwrap();

        assert_eq!(
            tc.format,
            Format::Ccs {
                resolution: 3,
                day_of_year: false,
            }
        );
        assert_eq!(tc.epoch_type(), EpochType::NotApplicable);
        assert_eq!(tc.sub_second, SubSecond::new(112_233, 1_000_000));
        let (y, m, d, hh, mm, ss, ns) = tc.timestamp.unwrap().to_gregorian_utc();
        assert_eq!((y, m, d, hh, mm, ss, ns), (2018, 11, 13, 16, 59, 0, 112_233_000));
    }

    #[test_case(0b0000_0000 ; "id 0")]
    #[test_case(0b0000_0110 ; "id 3")]
    #[test_case(0b0000_1110 ; "id 7")]
    #[test_case(0b1111_1111 ; "id 7 all bits")]
    fn invalid_time_code(p_field: u16) {
        assert!(matches!(
            decode(p_field, &[0u8; 8], None),
            Err(Error::InvalidTimeCode { .. })
        ));
    }

    #[test_case(0b0000_0100 ; "cuc level 2")]
    #[test_case(0b0000_1100 ; "agency defined")]
    #[test_case(0b1100_1000 ; "cds reserved submillis")]
    #[test_case(0b1110_1010 ; "ccs reserved resolution")]
    fn unsupported_format(p_field: u16) {
        assert!(matches!(
            Format::from_pfield(p_field),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn only_low_byte_of_pfield_is_used() {
        assert_eq!(
            Format::from_pfield(0xff32).unwrap(),
            Format::from_pfield(0x0032).unwrap()
        );
    }

    #[test_case(0b0011_0010, 3 ; "cuc short")]
    #[test_case(0b0011_0010, 5 ; "cuc long")]
    #[test_case(0b0000_1000, 8 ; "cds")]
    #[test_case(0b0110_1010, 7 ; "ccs")]
    fn field_length_mismatch(p_field: u16, len: usize) {
        assert!(matches!(
            decode(p_field, &vec![0u8; len], None),
            Err(Error::FieldLengthMismatch { actual, .. }) if actual == len
        ));
    }

    #[test_case(0b0000_1000 => (2, 0) ; "2 day bytes no submillis")]
    #[test_case(0b0010_1000 => (3, 0) ; "3 day bytes")]
    #[test_case(0b0100_1000 => (2, 2) ; "micro")]
    #[test_case(0b1000_1000 => (2, 4) ; "pico")]
    fn cds_widths(p_field: u16) -> (usize, usize) {
        match Format::from_pfield(p_field).unwrap() {
            Format::Cds {
                num_day,
                num_submillis,
                ..
            } => (num_day, num_submillis),
            other => panic!("expected CDS, got {other:?}"),
        }
    }

    #[test]
    fn cds_level_2() {
        let format = Format::from_pfield(0b0001_1000).unwrap();
        assert_eq!(format.level(), 2);
        assert_eq!(format.epoch_type(), EpochType::AgencyDefined);

        let epoch = Epoch::from_gregorian_utc_at_midnight(2000, 1, 1);
        let tc = decode(0b0001_1000, &[0x00, 0x0a, 0x00, 0x00, 0x03, 0xe8], Some(epoch)).unwrap();
        let (y, m, d, hh, mm, ss, _) = tc.timestamp.unwrap().to_gregorian_utc();
        assert_eq!((y, m, d, hh, mm, ss), (2000, 1, 11, 0, 0, 1));
    }

    #[test]
    fn with_epoch_ignored_for_fixed_epoch() {
        let tc = decode(0b0000_1000, &hex::decode("56d703a4ec90").unwrap(), None).unwrap();
        let resolved = tc.clone().with_epoch(Epoch::from_gregorian_utc_at_midnight(2000, 1, 1));
        assert_eq!(tc, resolved);
    }
}

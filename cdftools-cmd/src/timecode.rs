use std::io::{stdout, Write};

use anyhow::{Context, Result};
use cdftools::timecode::{decode, DecodedTime, EpochType, SubSecond, TimeScale};
use handlebars::{no_escape, Handlebars};
use hifitime::Epoch;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Serialize)]
struct Info {
    pfield: String,
    tfield: String,
    name: &'static str,
    level: u8,
    epoch_type: EpochType,
    time_scale: TimeScale,
    epoch: Option<String>,
    elapsed_seconds: Option<f64>,
    timestamp: Option<String>,
    sub_second: SubSecond,
    precision_loss: bool,
}

impl Info {
    fn new(pfield: u16, tfield: &[u8], time: &DecodedTime) -> Self {
        Self {
            pfield: format!("{pfield:#06x}"),
            tfield: hex::encode(tfield),
            name: time.name(),
            level: time.level(),
            epoch_type: time.epoch_type(),
            time_scale: time.time_scale(),
            epoch: time.epoch.map(|e| e.to_string()),
            elapsed_seconds: time.elapsed.map(|d| d.to_seconds()),
            timestamp: time.timestamp.map(|e| e.to_string()),
            sub_second: time.sub_second,
            precision_loss: time.precision_loss(),
        }
    }
}

const TEXT_TEMPLATE: &str = r"P-field:    {{ pfield }}
T-field:    {{ tfield }}
Format:     {{ name }} (level {{ level }})
Epoch type: {{ epoch_type }}
Time scale: {{ time_scale }}
Epoch:      {{ #if epoch }}{{ epoch }}{{ else }}-{{ /if }}
Elapsed:    {{ #if (ne elapsed_seconds null) }}{{ elapsed_seconds }}s{{ else }}-{{ /if }}
Timestamp:  {{ #if timestamp }}{{ timestamp }}{{ else }}-{{ /if }}
Sub-second: {{ sub_second.numerator }}/{{ sub_second.denominator }}{{ #if precision_loss }} (truncated to microseconds){{ /if }}
";

fn render_text(info: &Info) -> Result<String> {
    let mut hb = Handlebars::new();
    hb.register_escape_fn(no_escape);
    hb.register_template_string("timecode", TEXT_TEMPLATE)
        .context("registering template")?;
    hb.render("timecode", info).context("rendering text")
}

pub fn timecode(pfield: u16, tfield: &[u8], epoch: Option<Epoch>, format: &Format) -> Result<()> {
    let time = decode(pfield, tfield, epoch)
        .with_context(|| format!("decoding p-field {pfield:#06x}"))?;
    debug!(?time, "decoded");
    if time.epoch_type() == EpochType::AgencyDefined && time.timestamp.is_none() {
        warn!("agency-defined epoch; use --epoch to resolve a timestamp");
    }
    let info = Info::new(pfield, tfield, &time);

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")?;
            println!();
            Ok(())
        }
        Format::Text => {
            let data = render_text(&info)?;
            stdout()
                .write_all(data.as_bytes())
                .context("writing to stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_cds() {
        let tfield = [0x56, 0xd7, 0x03, 0xa4, 0xec, 0x90];
        let time = decode(0x08, &tfield, None).unwrap();
        let text = render_text(&Info::new(0x08, &tfield, &time)).unwrap();

        assert!(text.contains("P-field:    0x0008\n"), "{text}");
        assert!(text.contains("T-field:    56d703a4ec90\n"), "{text}");
        assert!(text.contains("Epoch type: Ccsds\n"), "{text}");
        assert!(text.contains("Timestamp:  2018-11-13T16:59:00.112"), "{text}");
    }

    #[test]
    fn render_without_timestamp() {
        let tfield = [0x56, 0xd7, 0x03, 0xa4, 0xec, 0x90];
        let time = decode(0x18, &tfield, None).unwrap();
        let text = render_text(&Info::new(0x18, &tfield, &time)).unwrap();

        assert!(text.contains("Epoch type: AgencyDefined\n"), "{text}");
        assert!(text.contains("Timestamp:  -\n"), "{text}");
    }

    #[test]
    fn render_at_epoch() {
        let tfield = [0x00, 0x00, 0x00, 0x00];
        let time = decode(0b0011_0010, &tfield, None).unwrap();
        let text = render_text(&Info::new(0b0011_0010, &tfield, &time)).unwrap();

        assert!(text.contains("Elapsed:    0"), "{text}");
        assert!(!text.contains("Elapsed:    -"), "{text}");
    }
}

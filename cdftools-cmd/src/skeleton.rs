use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cdftools::skeleton::{Skeleton, TabularOptions, TextOptions};
use rayon::prelude::*;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Tabular,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Tabular, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Tabular => Some(clap::builder::PossibleValue::new("tabular")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Tabular),
            "skt" => Some(Self::Text),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Tabular => "json",
            Self::Text => "skt",
        }
    }

    fn other(self) -> Self {
        match self {
            Self::Tabular => Self::Text,
            Self::Text => Self::Tabular,
        }
    }
}

pub struct Opts {
    pub from: Option<Format>,
    pub to: Option<Format>,
    pub auto_pad: bool,
    pub clobber: bool,
}

fn input_format(input: &Path, opts: &Opts) -> Result<Format> {
    match opts.from.or_else(|| Format::from_path(input)) {
        Some(format) => Ok(format),
        None => bail!("cannot infer the format of {input:?}; use --from"),
    }
}

fn read(input: &Path, format: Format, opts: &Opts) -> Result<Skeleton> {
    let zult = match format {
        Format::Tabular => {
            let options = TabularOptions::builder().auto_pad(opts.auto_pad).build();
            Skeleton::from_tabular_file(input, options)
        }
        Format::Text => Skeleton::from_text_file(input),
    };
    zult.with_context(|| format!("reading {input:?}"))
}

fn write(skeleton: &Skeleton, output: &Path, format: Format) -> Result<()> {
    let zult = match format {
        Format::Tabular => skeleton.write_tabular_file(output),
        Format::Text => skeleton.write_text_file(output, TextOptions::default()),
    };
    zult.with_context(|| format!("writing {output:?}"))
}

/// Convert `input` to `output`.
pub fn convert(input: &Path, output: &Path, opts: &Opts) -> Result<()> {
    let from = input_format(input, opts)?;
    let to = opts
        .to
        .or_else(|| Format::from_path(output))
        .unwrap_or_else(|| from.other());
    if !opts.clobber && output.exists() {
        bail!("{output:?} exists; use --clobber");
    }
    info!("converting {input:?} ({from:?}) to {output:?} ({to:?})");

    let skeleton = read(input, from, opts)?;
    // Tabular outputs keep extra sheets of an existing workbook, clobber means start over
    if to == Format::Tabular && output.exists() {
        std::fs::remove_file(output).with_context(|| format!("removing {output:?}"))?;
    }
    write(&skeleton, output, to)
}

/// Convert every input into `dir`, in parallel.
pub fn convert_all(inputs: &[PathBuf], dir: &Path, opts: &Opts) -> Result<()> {
    if !dir.is_dir() {
        bail!("{dir:?} is not a directory");
    }
    let failures: Vec<PathBuf> = inputs
        .par_iter()
        .filter_map(|input| {
            let zult = input_format(input, opts).and_then(|from| {
                let to = opts.to.unwrap_or_else(|| from.other());
                let Some(stem) = input.file_stem() else {
                    bail!("{input:?} has no file name");
                };
                let output = dir.join(stem).with_extension(to.extension());
                convert(input, &output, opts)
            });
            match zult {
                Ok(()) => None,
                Err(err) => {
                    error!("{err:#}");
                    Some(input.clone())
                }
            }
        })
        .collect();

    if !failures.is_empty() {
        bail!("failed to convert {} of {} inputs", failures.len(), inputs.len());
    }
    info!("converted {} inputs to {dir:?}", inputs.len());
    Ok(())
}

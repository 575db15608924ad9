use std::io::Write;
use std::path::PathBuf;
use anyhow::{Context, Result};
use chrono::Local;
use clap::ValueEnum;
use serde::Deserialize;
use crate::projector::Table;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFmt { Csv, Tsv }

impl OutputFmt {
    fn delimiter(self) -> u8 { match self { OutputFmt::Csv => b',', OutputFmt::Tsv => b'\t' } }
    fn extension(self) -> &'static str { match self { OutputFmt::Csv => "csv", OutputFmt::Tsv => "tsv" } }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination { Stdout, File(PathBuf) }

impl Destination {
    /// `-` means stdout; no path means a timestamped file in the working directory.
    pub fn resolve(path: Option<&str>, fmt: OutputFmt) -> Self {
        match path {
            Some("-") => Destination::Stdout,
            Some(p) => Destination::File(PathBuf::from(p)),
            None => Destination::File(PathBuf::from(default_filename(fmt))),
        }
    }
}

pub fn default_filename(fmt: OutputFmt) -> String {
    format!("pool_metrics_{}.{}", Local::now().format("%Y%m%d_%H%M%S"), fmt.extension())
}

pub fn write_table<W: Write>(w: W, table: &Table, fmt: OutputFmt) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(fmt.delimiter()).flexible(false).from_writer(w);
    wtr.write_record(&table.header)?;
    for row in &table.rows { wtr.write_record(row)?; }
    wtr.flush()?;
    Ok(())
}

pub fn write_to(dest: &Destination, table: &Table, fmt: OutputFmt) -> Result<()> {
    match dest {
        Destination::Stdout => write_table(std::io::stdout().lock(), table, fmt).context("failed to write to stdout"),
        Destination::File(p) => {
            let f = std::fs::File::create(p).with_context(|| format!("failed to create {}", p.display()))?;
            write_table(std::io::BufWriter::new(f), table, fmt).with_context(|| format!("failed to write {}", p.display()))
        }
    }
}

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use tracing::info;

use crate::{error::Result, event::RawEvent};

pub mod binary;
pub mod text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Text,
    Binary,
}

pub fn load_events(path: impl AsRef<Path>, format: Format) -> Result<Vec<RawEvent>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let events = match format {
        Format::Text => text::read_events(reader)?,
        Format::Binary => binary::read_events(reader)?,
    };
    info!("read {} events from {}", events.len(), path.display());
    Ok(events)
}

pub fn save_binary(path: impl AsRef<Path>, events: &[RawEvent]) -> Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    binary::write_events(writer, events)?;
    info!("wrote {} events to {}", events.len(), path.as_ref().display());
    Ok(())
}

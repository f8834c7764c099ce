//! Utilities for reading fatplan inputs and writing plans.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use fatplan_core::{
    NumberParsing, Plan, PlanConfig, ScheduledFlow, Topology, Traffic, TrafficFormat,
};

/// Reads a [`Topology`] from an edge-list file.
pub fn read_topology(path: impl AsRef<Path>) -> Result<Topology, Error> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    Ok(Topology::parse(&contents)?)
}

/// Reads a traffic file of the given format.
pub fn read_traffic(
    path: impl AsRef<Path>,
    format: TrafficFormat,
    parsing: NumberParsing,
) -> Result<Traffic, Error> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    Ok(Traffic::parse(&contents, format, parsing)?)
}

/// Reads a [`PlanConfig`] from a file in JSON or Dhall format.
///
/// In Dhall, the unit enums (`format`, `parsing` and `outputs`) are union alternatives such as
/// ``< `flow-list` | matrix >.matrix``, while `application` and `start` are records tagged by a
/// `kind` field, such as `{ kind = "uniform", window = 100000000000 }`. Durations are naturals in
/// nanoseconds. `parsing` and `outputs` may be omitted.
pub fn read_config(path: impl AsRef<Path>) -> Result<PlanConfig, Error> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: PlanConfig = match extension(path.as_ref()) {
        Some("json") => serde_json::from_str(&contents)?,
        Some("dhall") => serde_dhall::from_str(&contents).parse().map_err(Box::new)?,
        _ => return Err(Error::UnknownFileType(path.as_ref().into())),
    };
    Ok(config)
}

/// Writes a plan and its schedule to a file in JSON or MsgPack format.
pub fn write_plan(
    path: impl AsRef<Path>,
    plan: &Plan,
    schedule: &[ScheduledFlow],
) -> Result<(), Error> {
    let record = PlanRecord { plan, schedule };
    match extension(path.as_ref()) {
        Some("json") => {
            let mut writer = BufWriter::new(File::create(path.as_ref())?);
            serde_json::to_writer_pretty(&mut writer, &record)?;
            writer.flush()?;
        }
        Some("msgpack") => {
            let mut writer = BufWriter::new(File::create(path.as_ref())?);
            rmp_serde::encode::write_named(&mut writer, &record)?;
            writer.flush()?;
        }
        _ => return Err(Error::UnknownFileType(path.as_ref().into())),
    }
    log::info!("wrote plan to {}", path.as_ref().display());
    Ok(())
}

/// Reads the schedule of a plan written by [`write_plan`].
pub fn read_schedule(path: impl AsRef<Path>) -> Result<Vec<ScheduledFlow>, Error> {
    let record: ScheduleRecord = match extension(path.as_ref()) {
        Some("json") => {
            let contents = std::fs::read_to_string(path.as_ref())?;
            serde_json::from_str(&contents)?
        }
        Some("msgpack") => {
            let f = File::open(path)?;
            let reader = BufReader::new(f);
            rmp_serde::decode::from_read(reader)?
        }
        _ => return Err(Error::UnknownFileType(path.as_ref().into())),
    };
    Ok(record.schedule)
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

#[derive(Debug, serde::Serialize)]
struct PlanRecord<'a> {
    plan: &'a Plan,
    schedule: &'a [ScheduledFlow],
}

#[derive(Debug, serde::Deserialize)]
struct ScheduleRecord {
    schedule: Vec<ScheduledFlow>,
}

/// Error kinds for inputs, plans and I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown file type.
    #[error("unknown file type: {0}")]
    UnknownFileType(PathBuf),

    /// Error serializing/deserializing Dhall.
    #[error("Dhall error")]
    Dhall(#[from] Box<serde_dhall::Error>),

    /// Error serializing/deserializing JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Error deserializing MsgPack.
    #[error("MsgPack error")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Error serializing MsgPack.
    #[error("MsgPack error")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// I/O error.
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// Error constructing a valid topology.
    #[error("invalid topology")]
    Topology(#[from] fatplan_core::TopologyError),

    /// Error parsing a traffic file.
    #[error("invalid traffic")]
    Traffic(#[from] fatplan_core::TrafficError),
}

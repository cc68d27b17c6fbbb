use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::Result,
    event::{Event, RawEvent, RecordCounts},
    histogram::HistogramSet,
    io::{load_events, Format},
    reconstruct::{DressedTau, Reconstructor},
    selection::RejectReason,
};

pub const HISTOGRAMS_FILE: &str = "histograms.dat";
pub const SUMMARY_FILE: &str = "summary.jsonl";
pub const INFO_FILE: &str = "info.yaml";

/// One line of `summary.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event: usize,
    pub decay_mode: i32,
    pub id_level: i32,
    pub tau_charge: i32,
    pub gen_id: i32,
    #[serde(flatten)]
    pub dressed: DressedTau,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub read: usize,
    pub without_tau: usize,
    pub rejected_id_level: usize,
    pub rejected_decay_mode: usize,
    pub rejected_no_candidates: usize,
    pub rejected_gen_match: usize,
    pub selected: usize,
    pub passing_d0_window: usize,
}

#[derive(Debug, Serialize)]
struct RunInfo<'a> {
    config: &'a Config,
    stats: &'a RunStats,
}

struct Selected {
    index: usize,
    event: Event,
    dressed: DressedTau,
    gen_id: i32,
}

enum Outcome {
    NoTau,
    Rejected(RejectReason, RecordCounts),
    Selected(Selected),
}

impl Outcome {
    fn fill(&self, set: &mut HistogramSet) {
        match self {
            Outcome::Rejected(reason, record) if !reason.is_preselection() => {
                set.fill_multiplicities(record)
            }
            Outcome::Selected(s) => {
                set.fill_multiplicities(&s.event.record);
                set.fill(&s.event, &s.dressed, s.gen_id);
            }
            _ => {}
        }
    }
}

pub struct RunOutput {
    pub config: Config,
    pub stats: RunStats,
    pub histograms: HistogramSet,
    pub summaries: Vec<EventSummary>,
}

pub fn process(raw_events: &[RawEvent], config: &Config) -> Result<RunOutput> {
    let reconstructor = Reconstructor::new(config.reconstruction);
    let selection = config.selection;

    let outcomes = raw_events
        .par_iter()
        .enumerate()
        .map(|(i, raw)| -> Result<Outcome> {
            let event = match raw.first_tau_event()? {
                Some(event) => event,
                None => return Ok(Outcome::NoTau),
            };
            if let Some(reason) = selection.reject_reason(&event) {
                debug!("event {i} rejected: {reason:?}");
                return Ok(Outcome::Rejected(reason, event.record));
            }
            let dressed = reconstructor.reconstruct(&event);
            Ok(Outcome::Selected(Selected {
                index: i,
                gen_id: selection.gen_id_of(&event),
                event,
                dressed,
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut stats = RunStats {
        read: raw_events.len(),
        ..Default::default()
    };
    for o in &outcomes {
        match o {
            Outcome::NoTau => stats.without_tau += 1,
            Outcome::Rejected(RejectReason::IdLevel, _) => stats.rejected_id_level += 1,
            Outcome::Rejected(RejectReason::DecayMode, _) => stats.rejected_decay_mode += 1,
            Outcome::Rejected(RejectReason::NoIsolationCandidates, _) => {
                stats.rejected_no_candidates += 1
            }
            Outcome::Rejected(RejectReason::GenMatch, _) => stats.rejected_gen_match += 1,
            Outcome::Selected(s) => {
                stats.selected += 1;
                if s.dressed.passes_d0_window {
                    stats.passing_d0_window += 1;
                }
            }
        }
    }

    let histograms = outcomes
        .par_iter()
        .fold(HistogramSet::book, |mut set, o| {
            o.fill(&mut set);
            set
        })
        .reduce(HistogramSet::book, HistogramSet::merge);

    let summaries = outcomes
        .into_iter()
        .filter_map(|o| match o {
            Outcome::Selected(s) => Some(EventSummary {
                event: s.index,
                decay_mode: s.event.tau.decay_mode,
                id_level: s.event.tau.id_level,
                tau_charge: s.event.tau.charge,
                gen_id: s.gen_id,
                dressed: s.dressed,
            }),
            _ => None,
        })
        .collect();

    info!(
        "{} events read, {} selected, {} inside the D0 mass window",
        stats.read, stats.selected, stats.passing_d0_window
    );
    if stats.selected == 0 && stats.read > 0 {
        warn!("no event passed the tau selection");
    }

    Ok(RunOutput {
        config: *config,
        stats,
        histograms,
        summaries,
    })
}

pub fn process_file(path: impl AsRef<Path>, format: Format, config: &Config) -> Result<RunOutput> {
    let events = load_events(path, format)?;
    process(&events, config)
}

impl RunOutput {
    pub fn write_summaries(&self, w: &mut impl Write) -> Result<()> {
        for s in &self.summaries {
            serde_json::to_writer(&mut *w, s)?;
            writeln!(w)?;
        }
        Ok(())
    }

    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        self.histograms.save(dir.join(HISTOGRAMS_FILE))?;

        let mut w = BufWriter::new(File::create(dir.join(SUMMARY_FILE))?);
        self.write_summaries(&mut w)?;
        w.flush()?;

        let info = RunInfo {
            config: &self.config,
            stats: &self.stats,
        };
        fs::write(dir.join(INFO_FILE), serde_yaml::to_string(&info)?)?;

        info!("results saved in {}", dir.display());
        Ok(())
    }
}

//! Whitespace separated event dump.
//!
//! ```text
//! # event 0
//! Tau 10.2 -3.1 5.0 12.1 15 10 2 5 0.04
//! ChargedHadron 0 1.1 0.2 0.4 1.2 -211
//! Photon 0 0.5 0.1 0.2 0.55
//! ```
//!
//! A `#` line opens a new event. The tau record is
//! `Tau px py pz E pdg_id decay_mode id_level [gen_pdg_id gen_dr]`, candidate
//! records are `<Kind> tau_index px py pz E [pdg_id]` with the code required
//! for `ChargedHadron`.

use std::{io::BufRead, str::FromStr};

use tracing::debug;

use crate::{
    error::{Error, Result},
    event::{Candidate, CandidateKind, IndexedCandidate, RawEvent, TauCandidate},
    kinematics::FourMomentum,
};

const TAU_TAG: &str = "Tau";

fn parse<T: FromStr>(token: &str, what: &str, line: usize) -> Result<T> {
    token.parse::<T>().map_err(|_| Error::Parse {
        line,
        msg: format!("cannot parse {what} from \"{token}\""),
    })
}

fn momentum(fields: &[&str], line: usize) -> Result<FourMomentum> {
    let mut p = [0.0f64; 4];
    for (v, f) in p.iter_mut().zip(fields) {
        *v = parse(f, "momentum component", line)?;
    }
    Ok(p.into())
}

fn parse_tau(fields: &[&str], line: usize) -> Result<TauCandidate> {
    if fields.len() != 7 && fields.len() != 9 {
        return Err(Error::Parse {
            line,
            msg: format!("tau record needs 7 or 9 values, found {}", fields.len()),
        });
    }
    let tau = TauCandidate::new(
        momentum(&fields[0..4], line)?,
        parse(fields[4], "pdg id", line)?,
        parse(fields[5], "decay mode", line)?,
        parse(fields[6], "id level", line)?,
    );
    if fields.len() == 9 {
        Ok(tau.with_gen_match(
            parse(fields[7], "generator pdg id", line)?,
            parse(fields[8], "generator delta R", line)?,
        ))
    } else {
        Ok(tau)
    }
}

fn parse_candidate(kind: CandidateKind, fields: &[&str], line: usize) -> Result<IndexedCandidate> {
    let expected = match kind {
        CandidateKind::ChargedHadron => 6..=6,
        CandidateKind::NeutralHadron | CandidateKind::Photon => 5..=6,
    };
    if !expected.contains(&fields.len()) {
        return Err(Error::Parse {
            line,
            msg: format!("{kind} record has {} values", fields.len()),
        });
    }
    let tau_index = parse(fields[0], "tau index", line)?;
    let p4 = momentum(&fields[1..5], line)?;
    let candidate = match kind {
        CandidateKind::ChargedHadron => Candidate::charged(p4, parse(fields[5], "pdg id", line)?),
        CandidateKind::NeutralHadron => Candidate::neutral_hadron(p4),
        CandidateKind::Photon => Candidate::photon(p4),
    };
    Ok(IndexedCandidate {
        tau_index,
        candidate,
    })
}

pub fn read_events(reader: impl BufRead) -> Result<Vec<RawEvent>> {
    let mut events: Vec<RawEvent> = vec![];
    for (i, l) in reader.lines().enumerate() {
        let line = i + 1;
        let l = l?;
        let l = l.trim();
        if l.is_empty() {
            continue;
        }
        if l.starts_with('#') {
            events.push(RawEvent::default());
            continue;
        }
        let event = events.last_mut().ok_or_else(|| Error::Parse {
            line,
            msg: "record before the first event header".to_string(),
        })?;
        let tokens: Vec<&str> = l.split_whitespace().collect();
        let (tag, fields) = (tokens[0], &tokens[1..]);
        if tag == TAU_TAG {
            event.taus.push(parse_tau(fields, line)?);
            continue;
        }
        let kind = tag.parse::<CandidateKind>().map_err(|_| Error::Parse {
            line,
            msg: format!("unknown record \"{tag}\""),
        })?;
        let c = parse_candidate(kind, fields, line)?;
        match kind {
            CandidateKind::ChargedHadron => event.charged.push(c),
            CandidateKind::NeutralHadron => event.neutral.push(c),
            CandidateKind::Photon => event.photons.push(c),
        }
    }
    debug!("parsed {} text events", events.len());
    Ok(events)
}

//! Little-endian packed event stream.
//!
//! Each event starts with four `u32` counts (taus, charged, neutral, photons).
//! A tau is `4×f64` momentum, `i32` pdg id, `i32` decay mode, `i32` id level,
//! `i32` generator pdg id and `f64` generator ΔR (negative when unmatched).
//! A candidate is `u32` tau index, `4×f64` momentum and `i32` pdg id.

use std::io::{ErrorKind, Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    error::Result,
    event::{Candidate, CandidateKind, IndexedCandidate, RawEvent, TauCandidate},
    kinematics::FourMomentum,
};

const HEADER_SIZE: usize = 4 * std::mem::size_of::<u32>();
const MOMENTUM_SIZE: usize = 4 * std::mem::size_of::<f64>();
/// Header counts are untrusted, reserve at most this many records up front.
const MAX_RESERVED: u32 = 1024;

/// `None` on a clean end of stream.
fn read_header(r: &mut impl Read) -> Result<Option<[u32; 4]>> {
    let mut bytes = [0u8; HEADER_SIZE];
    let mut filled = 0;
    while filled < HEADER_SIZE {
        match r.read(&mut bytes[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if filled == 0 {
        return Ok(None);
    }
    if filled < HEADER_SIZE {
        return Err(std::io::Error::new(ErrorKind::UnexpectedEof, "truncated event header").into());
    }
    let mut counts = [0u32; 4];
    LittleEndian::read_u32_into(&bytes, &mut counts);
    Ok(Some(counts))
}

fn read_momentum(r: &mut impl Read) -> Result<FourMomentum> {
    let mut bytes = [0u8; MOMENTUM_SIZE];
    r.read_exact(&mut bytes)?;
    let mut p = [0.0f64; 4];
    LittleEndian::read_f64_into(&bytes, &mut p);
    Ok(p.into())
}

fn read_tau(r: &mut impl Read) -> Result<TauCandidate> {
    let p4 = read_momentum(r)?;
    let pdg_id = r.read_i32::<LittleEndian>()?;
    let decay_mode = r.read_i32::<LittleEndian>()?;
    let id_level = r.read_i32::<LittleEndian>()?;
    let gen_pdg_id = r.read_i32::<LittleEndian>()?;
    let gen_dr = r.read_f64::<LittleEndian>()?;
    let tau = TauCandidate::new(p4, pdg_id, decay_mode, id_level);
    if gen_dr < 0.0 {
        Ok(tau)
    } else {
        Ok(tau.with_gen_match(gen_pdg_id, gen_dr))
    }
}

fn read_candidates(
    r: &mut impl Read,
    kind: CandidateKind,
    n: u32,
) -> Result<Vec<IndexedCandidate>> {
    let mut candidates = Vec::with_capacity(n.min(MAX_RESERVED) as usize);
    for _ in 0..n {
        let tau_index = r.read_u32::<LittleEndian>()? as usize;
        let p4 = read_momentum(r)?;
        let pdg_id = r.read_i32::<LittleEndian>()?;
        let candidate = match kind {
            CandidateKind::ChargedHadron => Candidate::charged(p4, pdg_id),
            CandidateKind::NeutralHadron => Candidate::neutral_hadron(p4),
            CandidateKind::Photon => Candidate::photon(p4),
        };
        candidates.push(IndexedCandidate {
            tau_index,
            candidate,
        });
    }
    Ok(candidates)
}

pub fn read_events(mut r: impl Read) -> Result<Vec<RawEvent>> {
    let mut events = vec![];
    while let Some([n_taus, n_charged, n_neutral, n_photons]) = read_header(&mut r)? {
        let mut taus = Vec::with_capacity(n_taus.min(MAX_RESERVED) as usize);
        for _ in 0..n_taus {
            taus.push(read_tau(&mut r)?);
        }
        events.push(RawEvent {
            taus,
            charged: read_candidates(&mut r, CandidateKind::ChargedHadron, n_charged)?,
            neutral: read_candidates(&mut r, CandidateKind::NeutralHadron, n_neutral)?,
            photons: read_candidates(&mut r, CandidateKind::Photon, n_photons)?,
        });
    }
    Ok(events)
}

fn write_momentum(w: &mut impl Write, p4: &FourMomentum) -> Result<()> {
    let mut bytes = [0u8; MOMENTUM_SIZE];
    LittleEndian::write_f64_into(&p4.as_array(), &mut bytes);
    w.write_all(&bytes)?;
    Ok(())
}

fn write_candidates(w: &mut impl Write, candidates: &[IndexedCandidate]) -> Result<()> {
    for c in candidates {
        w.write_u32::<LittleEndian>(c.tau_index as u32)?;
        write_momentum(w, &c.candidate.p4)?;
        w.write_i32::<LittleEndian>(c.candidate.pdg_id)?;
    }
    Ok(())
}

pub fn write_events(mut w: impl Write, events: &[RawEvent]) -> Result<()> {
    for e in events {
        for n in [e.taus.len(), e.charged.len(), e.neutral.len(), e.photons.len()] {
            w.write_u32::<LittleEndian>(n as u32)?;
        }
        for tau in &e.taus {
            write_momentum(&mut w, &tau.p4)?;
            w.write_i32::<LittleEndian>(tau.charge)?;
            w.write_i32::<LittleEndian>(tau.decay_mode)?;
            w.write_i32::<LittleEndian>(tau.id_level)?;
            let (gen_id, gen_dr) = tau.gen_match.map_or((0, -1.0), |m| (m.pdg_id, m.delta_r));
            w.write_i32::<LittleEndian>(gen_id)?;
            w.write_f64::<LittleEndian>(gen_dr)?;
        }
        write_candidates(&mut w, &e.charged)?;
        write_candidates(&mut w, &e.neutral)?;
        write_candidates(&mut w, &e.photons)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, io::text};

    const DUMP: &str = "\
# event 0
Tau 10.0 0.0 2.0 10.3 15 10 2 5 0.04
ChargedHadron 0 1.0 0.1 0.2 1.03 -211
NeutralHadron 0 0.5 0.0 0.1 0.6
Photon 0 0.5 0.05 0.1 0.51
# event 1
Tau -5.0 5.0 0.0 7.2 -15 1 1
# event 2
";

    #[test]
    fn text_events_survive_packing() {
        let events = text::read_events(DUMP.as_bytes()).unwrap();
        let mut bytes = vec![];
        write_events(&mut bytes, &events).unwrap();
        assert_eq!(read_events(bytes.as_slice()).unwrap(), events);
    }

    #[test]
    fn empty_stream_has_no_events() {
        assert!(read_events(std::io::empty()).unwrap().is_empty());
    }

    #[test]
    fn truncated_record_is_an_error() {
        let events = text::read_events(DUMP.as_bytes()).unwrap();
        let mut bytes = vec![];
        write_events(&mut bytes, &events[..1]).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(read_events(bytes.as_slice()), Err(Error::Io(_))));

        let mut bytes = vec![];
        write_events(&mut bytes, &events[..1]).unwrap();
        bytes.extend_from_slice(&[1, 0]);
        assert!(matches!(read_events(bytes.as_slice()), Err(Error::Io(_))));
    }

    #[test]
    fn oversized_counts_hit_end_of_stream() {
        for counts in [[0, u32::MAX, 0, 0], [u32::MAX, 0, 0, 0], [0, 0, 0, u32::MAX]] {
            let mut bytes = vec![0u8; HEADER_SIZE];
            LittleEndian::write_u32_into(&counts, &mut bytes);
            assert!(matches!(read_events(bytes.as_slice()), Err(Error::Io(_))));
        }
    }
}

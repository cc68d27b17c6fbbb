use std::collections::BTreeMap;

// `EnumFromStr` expands to a bare `Result<Self, Self::Err>`, so the crate
// alias stays out of scope here.
use crate::{error::Error, kinematics::FourMomentum};

custom_derive! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay, EnumFromStr, IterVariants(CandidateKinds))]
    pub enum CandidateKind {
        ChargedHadron,
        NeutralHadron,
        Photon
    }
}

/// Sign convention of the ntuples: positive particle-ID codes are charge +1.
pub fn charge_from_pdg_id(pdg_id: i32) -> i32 {
    if pdg_id > 0 {
        1
    } else {
        -1
    }
}

/// Isolation candidate of a tau.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub p4: FourMomentum,
    pub kind: CandidateKind,
    pub charge: i32,
    pub pdg_id: i32,
}

pub const NEUTRAL_HADRON_PDG_ID: i32 = 130;
pub const PHOTON_PDG_ID: i32 = 22;

impl Candidate {
    pub fn charged(p4: FourMomentum, pdg_id: i32) -> Self {
        Candidate {
            p4,
            kind: CandidateKind::ChargedHadron,
            charge: charge_from_pdg_id(pdg_id),
            pdg_id,
        }
    }

    pub fn neutral_hadron(p4: FourMomentum) -> Self {
        Candidate {
            p4,
            kind: CandidateKind::NeutralHadron,
            charge: 0,
            pdg_id: NEUTRAL_HADRON_PDG_ID,
        }
    }

    pub fn photon(p4: FourMomentum) -> Self {
        Candidate {
            p4,
            kind: CandidateKind::Photon,
            charge: 0,
            pdg_id: PHOTON_PDG_ID,
        }
    }
}

/// Generator-level particle matched to a reconstructed tau.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenMatch {
    pub pdg_id: i32,
    pub delta_r: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TauCandidate {
    pub p4: FourMomentum,
    pub charge: i32,
    pub decay_mode: i32,
    pub id_level: i32,
    pub gen_match: Option<GenMatch>,
}

impl TauCandidate {
    pub fn new(p4: FourMomentum, pdg_id: i32, decay_mode: i32, id_level: i32) -> Self {
        TauCandidate {
            p4,
            charge: charge_from_pdg_id(pdg_id),
            decay_mode,
            id_level,
            gen_match: None,
        }
    }

    pub fn with_gen_match(mut self, pdg_id: i32, delta_r: f64) -> Self {
        self.gen_match = Some(GenMatch { pdg_id, delta_r });
        self
    }
}

/// Isolation candidates belonging to a single tau.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IsolationCone {
    pub charged: Vec<Candidate>,
    pub neutral: Vec<Candidate>,
    pub photons: Vec<Candidate>,
}

impl IsolationCone {
    pub fn len(&self) -> usize {
        self.charged.len() + self.neutral.len() + self.photons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_momentum(&self) -> FourMomentum {
        self.charged
            .iter()
            .chain(self.neutral.iter())
            .chain(self.photons.iter())
            .map(|c| c.p4)
            .sum()
    }

    pub fn counts(&self) -> RecordCounts {
        RecordCounts {
            charged: self.charged.len(),
            neutral: self.neutral.len(),
            photons: self.photons.len(),
        }
    }
}

/// Isolation candidate multiplicities summed over every tau of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub charged: usize,
    pub neutral: usize,
    pub photons: usize,
}

impl RecordCounts {
    pub fn total(&self) -> usize {
        self.charged + self.neutral + self.photons
    }
}

/// One tau under study together with its isolation cone.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub tau: TauCandidate,
    pub cone: IsolationCone,
    pub record: RecordCounts,
}

impl Event {
    /// Event whose record holds only this tau.
    pub fn new(tau: TauCandidate, cone: IsolationCone) -> Self {
        let record = cone.counts();
        Event { tau, cone, record }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedCandidate {
    pub tau_index: usize,
    pub candidate: Candidate,
}

/// Event record as delivered by the flat readers: every tau, and candidates
/// tagged with the index of the tau they were collected around.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    pub taus: Vec<TauCandidate>,
    pub charged: Vec<IndexedCandidate>,
    pub neutral: Vec<IndexedCandidate>,
    pub photons: Vec<IndexedCandidate>,
}

const GROUPING_INVARIANT: &str = "isolation candidates are grouped by tau index in ascending order";
const TAU_INDEX_INVARIANT: &str = "isolation candidate tau index refers to an existing tau";

pub fn validate_grouping(
    collection: CandidateKind,
    candidates: &[IndexedCandidate],
    n_taus: usize,
) -> crate::Result<()> {
    let mut previous = 0;
    for (i, c) in candidates.iter().enumerate() {
        if c.tau_index >= n_taus {
            return Err(Error::MalformedInput {
                invariant: TAU_INDEX_INVARIANT,
                detail: format!(
                    "{collection} candidate {i} has tau index {} but the event holds {n_taus} taus",
                    c.tau_index
                ),
            });
        }
        if c.tau_index < previous {
            return Err(Error::MalformedInput {
                invariant: GROUPING_INVARIANT,
                detail: format!(
                    "{collection} candidate {i} has tau index {} after tau index {previous}",
                    c.tau_index
                ),
            });
        }
        previous = c.tau_index;
    }
    Ok(())
}

pub fn group_by_tau(candidates: &[IndexedCandidate]) -> BTreeMap<usize, Vec<Candidate>> {
    let mut groups: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
    for c in candidates {
        groups.entry(c.tau_index).or_default().push(c.candidate);
    }
    groups
}

impl RawEvent {
    pub fn counts(&self) -> RecordCounts {
        RecordCounts {
            charged: self.charged.len(),
            neutral: self.neutral.len(),
            photons: self.photons.len(),
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        let n = self.taus.len();
        validate_grouping(CandidateKind::ChargedHadron, &self.charged, n)?;
        validate_grouping(CandidateKind::NeutralHadron, &self.neutral, n)?;
        validate_grouping(CandidateKind::Photon, &self.photons, n)
    }

    pub fn event_for_tau(&self, index: usize) -> crate::Result<Event> {
        self.validate()?;
        let tau = *self.taus.get(index).ok_or_else(|| Error::MalformedInput {
            invariant: TAU_INDEX_INVARIANT,
            detail: format!("tau {index} requested but the event holds {} taus", self.taus.len()),
        })?;
        let select = |candidates: &[IndexedCandidate]| {
            group_by_tau(candidates).remove(&index).unwrap_or_default()
        };
        Ok(Event {
            tau,
            cone: IsolationCone {
                charged: select(&self.charged),
                neutral: select(&self.neutral),
                photons: select(&self.photons),
            },
            record: self.counts(),
        })
    }

    /// The leading tau of the record, `None` when the record has no tau.
    pub fn first_tau_event(&self) -> crate::Result<Option<Event>> {
        if self.taus.is_empty() {
            self.validate()?;
            return Ok(None);
        }
        self.event_for_tau(0).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p4(pt: f64, phi: f64) -> FourMomentum {
        FourMomentum::from_pt_eta_phi_m(pt, 0.0, phi, 0.14)
    }

    fn indexed(tau_index: usize, candidate: Candidate) -> IndexedCandidate {
        IndexedCandidate {
            tau_index,
            candidate,
        }
    }

    fn two_tau_event() -> RawEvent {
        RawEvent {
            taus: vec![
                TauCandidate::new(p4(30.0, 0.0), -15, 10, 2),
                TauCandidate::new(p4(20.0, 2.0), 15, 0, 1),
            ],
            charged: vec![
                indexed(0, Candidate::charged(p4(1.0, 0.1), 211)),
                indexed(0, Candidate::charged(p4(2.0, 0.2), -211)),
                indexed(1, Candidate::charged(p4(3.0, 2.1), 211)),
            ],
            neutral: vec![indexed(1, Candidate::neutral_hadron(p4(1.5, 2.0)))],
            photons: vec![indexed(0, Candidate::photon(p4(0.5, 0.05)))],
        }
    }

    #[test]
    fn charge_follows_pdg_id_sign() {
        assert_eq!(charge_from_pdg_id(211), 1);
        assert_eq!(charge_from_pdg_id(-211), -1);
        assert_eq!(charge_from_pdg_id(0), -1);
        assert_eq!(TauCandidate::new(p4(1.0, 0.0), 15, 0, 0).charge, 1);
    }

    #[test]
    fn kind_names_parse_back() {
        for kind in CandidateKind::iter_variants() {
            let parsed: CandidateKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("Muon".parse::<CandidateKind>().is_err());
    }

    #[test]
    fn first_tau_takes_only_its_candidates() {
        let event = two_tau_event().first_tau_event().unwrap().unwrap();
        assert_eq!(event.tau.decay_mode, 10);
        assert_eq!(event.cone.charged.len(), 2);
        assert_eq!(event.cone.neutral.len(), 0);
        assert_eq!(event.cone.photons.len(), 1);
        assert_eq!(event.cone.len(), 3);
    }

    #[test]
    fn second_tau_is_reachable() {
        let event = two_tau_event().event_for_tau(1).unwrap();
        assert_eq!(event.cone.charged.len(), 1);
        assert_eq!(event.cone.neutral.len(), 1);
        assert!(event.cone.photons.is_empty());
        assert_eq!(event.record.total(), 5);
    }

    #[test]
    fn record_counts_span_every_tau() {
        let event = two_tau_event().first_tau_event().unwrap().unwrap();
        assert_eq!(event.cone.counts().total(), 3);
        assert_eq!(
            event.record,
            RecordCounts {
                charged: 3,
                neutral: 1,
                photons: 1
            }
        );
    }

    #[test]
    fn candidates_keep_their_pdg_id() {
        let raw = two_tau_event();
        assert_eq!(raw.charged[1].candidate.pdg_id, -211);
        assert_eq!(raw.neutral[0].candidate.pdg_id, NEUTRAL_HADRON_PDG_ID);
        assert_eq!(raw.photons[0].candidate.pdg_id, PHOTON_PDG_ID);
    }

    #[test]
    fn no_tau_is_not_an_error() {
        assert_eq!(RawEvent::default().first_tau_event().unwrap(), None);
    }

    #[test]
    fn unsorted_grouping_is_rejected() {
        let mut raw = two_tau_event();
        raw.charged.swap(1, 2);
        match raw.first_tau_event() {
            Err(Error::MalformedInput { invariant, detail }) => {
                assert_eq!(invariant, GROUPING_INVARIANT);
                assert!(detail.contains("ChargedHadron candidate 2"));
            }
            other => panic!("expected malformed input, got {other:?}"),
        }
    }

    #[test]
    fn dangling_tau_index_is_rejected() {
        let mut raw = two_tau_event();
        raw.photons.push(indexed(5, Candidate::photon(p4(1.0, 0.0))));
        assert!(matches!(
            raw.first_tau_event(),
            Err(Error::MalformedInput {
                invariant: TAU_INDEX_INVARIANT,
                ..
            })
        ));
    }

    #[test]
    fn grouping_keeps_order_within_a_tau() {
        let raw = two_tau_event();
        let groups = group_by_tau(&raw.charged);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&0][0].charge, 1);
        assert_eq!(groups[&0][1].charge, -1);
    }

    #[test]
    fn cone_momentum_sums_every_kind() {
        let event = two_tau_event().first_tau_event().unwrap().unwrap();
        let expected = event.cone.charged[0].p4 + event.cone.charged[1].p4 + event.cone.photons[0].p4;
        assert_eq!(event.cone.total_momentum(), expected);
    }
}

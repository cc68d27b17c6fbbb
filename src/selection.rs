use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Generator ID assigned to taus without a close generator match.
pub const UNMATCHED_GEN_ID: i32 = -11;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenRequirement {
    /// Matches farther than this are treated as unmatched.
    pub max_delta_r: f64,
    pub abs_pdg_id: i32,
}

impl Default for GenRequirement {
    fn default() -> Self {
        GenRequirement {
            max_delta_r: 0.3,
            abs_pdg_id: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    IdLevel,
    DecayMode,
    NoIsolationCandidates,
    GenMatch,
}

impl RejectReason {
    /// Cuts applied before the record multiplicities are histogrammed.
    pub fn is_preselection(self) -> bool {
        matches!(self, RejectReason::IdLevel | RejectReason::DecayMode)
    }
}

/// Which taus get reconstructed. Thresholds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TauSelection {
    pub min_id_level: i32,
    pub min_decay_mode: i32,
    pub require_isolation_candidates: bool,
    pub gen_match: Option<GenRequirement>,
}

impl Default for TauSelection {
    fn default() -> Self {
        TauSelection {
            min_id_level: 0,
            min_decay_mode: 9,
            require_isolation_candidates: true,
            gen_match: Some(GenRequirement::default()),
        }
    }
}

impl TauSelection {
    /// Accepts every tau.
    pub fn open() -> Self {
        TauSelection {
            min_id_level: i32::MIN,
            min_decay_mode: i32::MIN,
            require_isolation_candidates: false,
            gen_match: None,
        }
    }

    /// Generator ID of the tau, using the default matching radius when
    /// generator matching is not required.
    pub fn gen_id_of(&self, event: &Event) -> i32 {
        Self::gen_id(event, &self.gen_match.unwrap_or_default())
    }

    pub fn gen_id(event: &Event, requirement: &GenRequirement) -> i32 {
        match event.tau.gen_match {
            Some(m) if m.delta_r < requirement.max_delta_r => m.pdg_id,
            _ => UNMATCHED_GEN_ID,
        }
    }

    pub fn reject_reason(&self, event: &Event) -> Option<RejectReason> {
        let tau = &event.tau;
        if tau.id_level <= self.min_id_level {
            return Some(RejectReason::IdLevel);
        }
        if tau.decay_mode <= self.min_decay_mode {
            return Some(RejectReason::DecayMode);
        }
        // any tau of the record counts
        if self.require_isolation_candidates && event.record.total() == 0 {
            return Some(RejectReason::NoIsolationCandidates);
        }
        if let Some(requirement) = &self.gen_match {
            if Self::gen_id(event, requirement).abs() != requirement.abs_pdg_id {
                return Some(RejectReason::GenMatch);
            }
        }
        None
    }

    pub fn accepts(&self, event: &Event) -> bool {
        self.reject_reason(event).is_none()
    }
}

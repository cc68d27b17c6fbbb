//! Dressed-tau reconstruction.
//!
//! A tau is "dressed" by absorbing nearby isolation candidates. The charged
//! candidates are split by their charge relative to the tau, photons close to
//! the tau are summed into a single momentum, and invariant masses are formed
//! for three absorption topologies:
//!
//! - `Neutral`: tau + one opposite-charge candidate,
//! - `SameChargeCancel`: tau + one opposite-charge + one same-charge candidate,
//! - `ChargeFlip`: tau + two distinct opposite-charge candidates.
//!
//! Each topology is evaluated with and without the close-photon momentum.

use serde::{Deserialize, Serialize};

use crate::{
    event::{Candidate, Event, TauCandidate},
    kinematics::FourMomentum,
};

pub const DEFAULT_PHOTON_RADIUS: f64 = 0.2;
pub const D0_MASS_LOW: f64 = 1.7; // GeV
pub const D0_MASS_HIGH: f64 = 2.0; // GeV

custom_derive! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay, IterVariants(Hypotheses))]
    pub enum Hypothesis {
        Neutral,
        SameChargeCancel,
        ChargeFlip
    }
}

/// Open mass interval, bounds excluded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassWindow {
    pub low: f64,
    pub high: f64,
}

impl MassWindow {
    pub fn contains(&self, m: f64) -> bool {
        self.low < m && m < self.high
    }
}

impl Default for MassWindow {
    fn default() -> Self {
        MassWindow {
            low: D0_MASS_LOW,
            high: D0_MASS_HIGH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Photons closer than this ΔR to the tau are added to the dressing.
    pub photon_radius: f64,
    pub d0_window: MassWindow,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        ReconstructionConfig {
            photon_radius: DEFAULT_PHOTON_RADIUS,
            d0_window: MassWindow::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HypothesisMasses {
    pub plain: Vec<f64>,
    pub with_gamma: Vec<f64>,
}

impl HypothesisMasses {
    fn push(&mut self, sum: FourMomentum, photons: FourMomentum) {
        self.plain.push(sum.mass());
        self.with_gamma.push((sum + photons).mass());
    }

    pub fn len(&self) -> usize {
        self.plain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plain.is_empty()
    }
}

/// Per charged isolation candidate, in input order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargedDiagnostic {
    pub delta_r: f64,
    pub pt: f64,
    pub opposite_sign: bool,
    /// mass(tau + candidate)
    pub pair_mass: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DressedTau {
    pub n_opposite: usize,
    pub n_same: usize,
    pub n_close_photons: usize,
    pub tau_mass: f64,
    pub photon_mass: f64,
    /// mass(tau + every charged candidate)
    pub charged_sum_mass: f64,
    pub charged_net_charge: i32,
    pub charged: Vec<ChargedDiagnostic>,
    pub neutral: HypothesisMasses,
    pub same_charge_cancel: HypothesisMasses,
    pub flipped: HypothesisMasses,
    pub passes_d0_window: bool,
}

impl DressedTau {
    pub fn masses(&self, hypothesis: Hypothesis) -> &HypothesisMasses {
        match hypothesis {
            Hypothesis::Neutral => &self.neutral,
            Hypothesis::SameChargeCancel => &self.same_charge_cancel,
            Hypothesis::ChargeFlip => &self.flipped,
        }
    }
}

pub fn any_in_window(masses: &[f64], window: &MassWindow) -> bool {
    masses.iter().any(|&m| window.contains(m))
}

pub fn reconstruct(
    tau: &TauCandidate,
    charged: &[Candidate],
    photons: &[Candidate],
    config: &ReconstructionConfig,
) -> DressedTau {
    let tau_p4 = tau.p4;

    let mut opposite: Vec<FourMomentum> = vec![];
    let mut same: Vec<FourMomentum> = vec![];
    let mut diagnostics = Vec::with_capacity(charged.len());
    for c in charged {
        let opposite_sign = c.charge * tau.charge < 0;
        if opposite_sign {
            opposite.push(c.p4);
        } else {
            same.push(c.p4);
        }
        diagnostics.push(ChargedDiagnostic {
            delta_r: tau_p4.delta_r(&c.p4),
            pt: c.p4.pt(),
            opposite_sign,
            pair_mass: (tau_p4 + c.p4).mass(),
        });
    }

    let close_photons: Vec<&Candidate> = photons
        .iter()
        .filter(|g| tau_p4.delta_r(&g.p4) < config.photon_radius)
        .collect();
    let gamma: FourMomentum = close_photons.iter().map(|g| g.p4).sum();

    let mut neutral = HypothesisMasses::default();
    for o in &opposite {
        neutral.push(tau_p4 + o, gamma);
    }

    let mut same_charge_cancel = HypothesisMasses::default();
    for o in &opposite {
        for s in &same {
            same_charge_cancel.push(tau_p4 + o + s, gamma);
        }
    }

    let mut flipped = HypothesisMasses::default();
    for (i, a) in opposite.iter().enumerate() {
        for b in &opposite[i + 1..] {
            flipped.push(tau_p4 + a + b, gamma);
        }
    }

    let passes_d0_window = any_in_window(&neutral.plain, &config.d0_window);

    DressedTau {
        n_opposite: opposite.len(),
        n_same: same.len(),
        n_close_photons: close_photons.len(),
        tau_mass: tau_p4.mass(),
        photon_mass: gamma.mass(),
        charged_sum_mass: (tau_p4 + charged.iter().map(|c| c.p4).sum::<FourMomentum>()).mass(),
        charged_net_charge: charged.iter().map(|c| c.charge).sum(),
        charged: diagnostics,
        neutral,
        same_charge_cancel,
        flipped,
        passes_d0_window,
    }
}

/// Reconstructor bound to a configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconstructor {
    pub config: ReconstructionConfig,
}

impl Reconstructor {
    pub fn new(config: ReconstructionConfig) -> Self {
        Reconstructor { config }
    }

    pub fn reconstruct(&self, event: &Event) -> DressedTau {
        reconstruct(
            &event.tau,
            &event.cone.charged,
            &event.cone.photons,
            &self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // positive code: tau charge +1
    const TAU_PDG: i32 = 15;

    fn tau() -> TauCandidate {
        TauCandidate::new(FourMomentum::from_pt_eta_phi_m(20.0, 0.5, 1.0, 1.2), TAU_PDG, 10, 1)
    }

    fn near(dphi: f64, m: f64, pdg_id: i32) -> Candidate {
        let t = tau().p4;
        Candidate::charged(
            FourMomentum::from_pt_eta_phi_m(1.0, t.eta(), t.phi() + dphi, m),
            pdg_id,
        )
    }

    fn photon_at(dphi: f64, pt: f64) -> Candidate {
        let t = tau().p4;
        Candidate::photon(FourMomentum::from_pt_eta_phi_m(pt, t.eta(), t.phi() + dphi, 0.0))
    }

    fn with_neutral_masses(masses: &[f64]) -> bool {
        any_in_window(masses, &MassWindow::default())
    }

    #[test]
    fn no_opposite_charge_gives_empty_hypotheses() {
        let same = [near(0.05, 0.14, TAU_PDG), near(0.1, 0.14, 211)];
        let photons = [photon_at(0.01, 2.0)];
        let d = reconstruct(&tau(), &same, &photons, &ReconstructionConfig::default());
        assert_eq!(d.n_opposite, 0);
        assert_eq!(d.n_same, 2);
        for h in Hypothesis::iter_variants() {
            assert!(d.masses(h).is_empty());
            assert!(d.masses(h).with_gamma.is_empty());
        }
        assert!(!d.passes_d0_window);
    }

    #[test]
    fn hypothesis_counts_follow_combinatorics() {
        // tau charge is +1 (positive code), so negative codes are opposite
        for n in 0..5 {
            for m in 0..4 {
                let mut charged = vec![];
                for i in 0..n {
                    charged.push(near(0.01 * i as f64, 0.14, -211));
                }
                for j in 0..m {
                    charged.push(near(-0.01 * j as f64, 0.14, 211));
                }
                let d = reconstruct(&tau(), &charged, &[], &ReconstructionConfig::default());
                assert_eq!(d.n_opposite, n);
                assert_eq!(d.n_same, m);
                assert_eq!(d.neutral.len(), n);
                assert_eq!(d.same_charge_cancel.len(), n * m);
                assert_eq!(d.same_charge_cancel.with_gamma.len(), n * m);
                assert_eq!(d.flipped.len(), n * n.saturating_sub(1) / 2);
                assert_eq!(d.charged.len(), n + m);
            }
        }
    }

    #[test]
    fn single_opposite_candidate_neutral_mass() {
        let tau = TauCandidate::new(FourMomentum::new(0.0, 0.0, 1.73, 2.0), TAU_PDG, 10, 1);
        let c = Candidate::charged(FourMomentum::from_pt_eta_phi_m(0.1, 2.5, 0.3, 0.8), -211);
        let d = reconstruct(&tau, &[c], &[], &ReconstructionConfig::default());
        assert_eq!(d.neutral.plain.len(), 1);
        assert_abs_diff_eq!(d.neutral.plain[0], (tau.p4 + c.p4).mass(), epsilon = 1e-12);
        assert_abs_diff_eq!(d.tau_mass, (4.0f64 - 1.73 * 1.73).sqrt(), epsilon = 1e-12);
        assert!(d.flipped.is_empty());
    }

    #[test]
    fn two_opposite_candidates_without_photons() {
        let a = near(0.05, 0.14, -211);
        let b = near(-0.08, 0.5, -211);
        let d = reconstruct(&tau(), &[a, b], &[], &ReconstructionConfig::default());
        assert_eq!(d.same_charge_cancel.len(), 0);
        assert_eq!(d.flipped.len(), 1);
        assert_eq!(d.neutral.len(), 2);
        assert_eq!(d.photon_mass, 0.0);
        assert_eq!(d.n_close_photons, 0);
        assert_abs_diff_eq!(d.flipped.plain[0], (tau().p4 + a.p4 + b.p4).mass(), epsilon = 1e-12);
        // no photons: dressing changes nothing
        assert_eq!(d.flipped.plain, d.flipped.with_gamma);
        assert_eq!(d.neutral.plain, d.neutral.with_gamma);
    }

    #[test]
    fn photon_radius_selects_close_photons() {
        let photons = [photon_at(0.05, 1.0), photon_at(0.19, 2.0), photon_at(0.25, 3.0)];
        let c = near(0.1, 0.14, -211);
        let d = reconstruct(&tau(), &[c], &photons, &ReconstructionConfig::default());
        assert_eq!(d.n_close_photons, 2);
        let gamma = photons[0].p4 + photons[1].p4;
        assert_abs_diff_eq!(d.photon_mass, gamma.mass(), epsilon = 1e-12);
        assert_abs_diff_eq!(
            d.neutral.with_gamma[0],
            (tau().p4 + c.p4 + gamma).mass(),
            epsilon = 1e-12
        );

        let wide = ReconstructionConfig {
            photon_radius: 0.3,
            ..Default::default()
        };
        assert_eq!(reconstruct(&tau(), &[c], &photons, &wide).n_close_photons, 3);
    }

    #[test]
    fn cancel_hypothesis_adds_both_candidates() {
        let o = near(0.05, 0.14, -211);
        let s = near(-0.05, 0.14, 211);
        let g = photon_at(0.02, 1.5);
        let d = reconstruct(&tau(), &[s, o], &[g], &ReconstructionConfig::default());
        let sum = tau().p4 + o.p4 + s.p4;
        assert_abs_diff_eq!(d.same_charge_cancel.plain[0], sum.mass(), epsilon = 1e-12);
        assert_abs_diff_eq!(d.same_charge_cancel.with_gamma[0], (sum + g.p4).mass(), epsilon = 1e-12);
        assert_eq!(d.charged_net_charge, 0);
        assert!(!d.charged[0].opposite_sign);
        assert!(d.charged[1].opposite_sign);
    }

    #[test]
    fn d0_window_is_open() {
        assert!(with_neutral_masses(&[1.75]));
        assert!(!with_neutral_masses(&[1.6, 2.1]));
        assert!(!with_neutral_masses(&[1.7]));
        assert!(!with_neutral_masses(&[2.0]));
        assert!(!with_neutral_masses(&[]));
    }

    #[test]
    fn d0_flag_uses_undressed_neutral_masses() {
        // tau at rest with mass 1.0 plus a candidate at rest with mass 0.75: pair mass 1.75
        let tau = TauCandidate::new(FourMomentum::new(0.0, 0.0, 0.0, 1.0), TAU_PDG, 10, 1);
        let c = Candidate::charged(FourMomentum::new(0.0, 0.0, 0.0, 0.75), -211);
        let d = reconstruct(&tau, &[c], &[], &ReconstructionConfig::default());
        assert_abs_diff_eq!(d.neutral.plain[0], 1.75, epsilon = 1e-12);
        assert!(d.passes_d0_window);

        let c = Candidate::charged(FourMomentum::new(0.0, 0.0, 0.0, 1.1), -211);
        let d = reconstruct(&tau, &[c], &[], &ReconstructionConfig::default());
        assert!(!d.passes_d0_window);
    }

    #[test]
    fn reconstructor_reads_event_cone() {
        let c = near(0.1, 0.14, -211);
        let event = Event::new(
            tau(),
            crate::event::IsolationCone {
                charged: vec![c],
                neutral: vec![],
                photons: vec![photon_at(0.1, 1.0)],
            },
        );
        let d = Reconstructor::default().reconstruct(&event);
        assert_eq!(d.n_opposite, 1);
        assert_eq!(d.n_close_photons, 1);
    }
}

use std::{
    f64::consts::PI,
    iter::Sum,
    ops::{Add, AddAssign},
};

use nalgebra::Vector4;

// [px, py, pz, E]
pub const PX: usize = 0;
pub const PY: usize = 1;
pub const PZ: usize = 2;
pub const E: usize = 3;

/// Pseudorapidity reported for a momentum along the beam axis.
const ETA_ALONG_BEAM: f64 = 1e10;

/// Lorentz four-momentum in the (px, py, pz, E) basis, in GeV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourMomentum(Vector4<f64>);

impl FourMomentum {
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        FourMomentum(Vector4::new(px, py, pz, e))
    }

    pub fn zero() -> Self {
        FourMomentum(Vector4::zeros())
    }

    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let e = (px * px + py * py + pz * pz + m * m).sqrt();
        Self::new(px, py, pz, e)
    }

    pub fn px(&self) -> f64 {
        self.0[PX]
    }
    pub fn py(&self) -> f64 {
        self.0[PY]
    }
    pub fn pz(&self) -> f64 {
        self.0[PZ]
    }
    pub fn e(&self) -> f64 {
        self.0[E]
    }

    pub fn p2(&self) -> f64 {
        self.px() * self.px() + self.py() * self.py() + self.pz() * self.pz()
    }

    pub fn pt(&self) -> f64 {
        self.px().hypot(self.py())
    }

    pub fn mass2(&self) -> f64 {
        self.e() * self.e() - self.p2()
    }

    /// Invariant mass. Space-like vectors give `-sqrt(-m^2)`, the zero vector gives 0.
    pub fn mass(&self) -> f64 {
        let m2 = self.mass2();
        if m2 >= 0.0 {
            m2.sqrt()
        } else {
            -(-m2).sqrt()
        }
    }

    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt == 0.0 {
            if self.pz() > 0.0 {
                ETA_ALONG_BEAM
            } else if self.pz() < 0.0 {
                -ETA_ALONG_BEAM
            } else {
                0.0
            }
        } else {
            (self.pz() / pt).asinh()
        }
    }

    pub fn phi(&self) -> f64 {
        if self.px() == 0.0 && self.py() == 0.0 {
            0.0
        } else {
            self.py().atan2(self.px())
        }
    }

    pub fn delta_phi(&self, other: &Self) -> f64 {
        wrap_phi(self.phi() - other.phi())
    }

    /// Angular separation `sqrt(deta^2 + dphi^2)`.
    pub fn delta_r(&self, other: &Self) -> f64 {
        let deta = self.eta() - other.eta();
        let dphi = self.delta_phi(other);
        (deta * deta + dphi * dphi).sqrt()
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.px(), self.py(), self.pz(), self.e()]
    }
}

/// Maps an angle difference to (-pi, pi].
pub fn wrap_phi(dphi: f64) -> f64 {
    PI - (PI - dphi).rem_euclid(2.0 * PI)
}

impl Default for FourMomentum {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<[f64; 4]> for FourMomentum {
    fn from([px, py, pz, e]: [f64; 4]) -> Self {
        Self::new(px, py, pz, e)
    }
}

impl Add for FourMomentum {
    type Output = FourMomentum;

    fn add(self, rhs: Self) -> Self::Output {
        FourMomentum(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a FourMomentum> for FourMomentum {
    type Output = FourMomentum;

    fn add(self, rhs: &'a FourMomentum) -> Self::Output {
        FourMomentum(self.0 + rhs.0)
    }
}

impl AddAssign for FourMomentum {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for FourMomentum {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, p| acc + p)
    }
}

impl<'a> Sum<&'a FourMomentum> for FourMomentum {
    fn sum<I: Iterator<Item = &'a FourMomentum>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, p| acc + p)
    }
}

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use lazy_static::lazy_static;

use crate::{
    error::Result,
    event::{Event, RecordCounts},
    reconstruct::{DressedTau, Hypothesis},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binning {
    pub n_bins: usize,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bin {
    Underflow,
    In(usize),
    Overflow,
}

impl Binning {
    pub const fn new(n_bins: usize, low: f64, high: f64) -> Self {
        Binning { n_bins, low, high }
    }

    pub fn width(&self) -> f64 {
        (self.high - self.low) / self.n_bins as f64
    }

    /// Bins are closed on the left; NaN lands in the underflow.
    pub fn find(&self, x: f64) -> Bin {
        if !(x >= self.low) {
            Bin::Underflow
        } else if x >= self.high {
            Bin::Overflow
        } else {
            let i = ((x - self.low) / self.width()) as usize;
            Bin::In(i.min(self.n_bins - 1))
        }
    }

    pub fn center(&self, i: usize) -> f64 {
        self.low + (i as f64 + 0.5) * self.width()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    pub name: String,
    pub binning: Binning,
    pub contents: Vec<f64>,
    pub underflow: f64,
    pub overflow: f64,
    pub entries: u64,
}

impl Histogram1D {
    pub fn new(name: &str, binning: Binning) -> Self {
        Histogram1D {
            name: name.to_string(),
            binning,
            contents: vec![0.0; binning.n_bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    pub fn fill(&mut self, x: f64) {
        self.entries += 1;
        match self.binning.find(x) {
            Bin::Underflow => self.underflow += 1.0,
            Bin::Overflow => self.overflow += 1.0,
            Bin::In(i) => self.contents[i] += 1.0,
        }
    }

    pub fn integral(&self) -> f64 {
        self.contents.iter().sum()
    }

    pub fn merge(&mut self, other: &Histogram1D) {
        debug_assert_eq!(self.binning, other.binning);
        for (a, b) in self.contents.iter_mut().zip(other.contents.iter()) {
            *a += b;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
    }

    pub fn write(&self, w: &mut impl Write) -> std::io::Result<()> {
        let b = &self.binning;
        writeln!(w, "# {} {} {} {}", self.name, b.n_bins, b.low, b.high)?;
        writeln!(
            w,
            "# entries {} underflow {} overflow {}",
            self.entries, self.underflow, self.overflow
        )?;
        for (i, c) in self.contents.iter().enumerate() {
            writeln!(w, "{} {}", b.center(i), c)?;
        }
        writeln!(w)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2D {
    pub name: String,
    pub x: Binning,
    pub y: Binning,
    /// Row major: `contents[iy * x.n_bins + ix]`.
    pub contents: Vec<f64>,
    pub outside: f64,
    pub entries: u64,
}

impl Histogram2D {
    pub fn new(name: &str, x: Binning, y: Binning) -> Self {
        Histogram2D {
            name: name.to_string(),
            x,
            y,
            contents: vec![0.0; x.n_bins * y.n_bins],
            outside: 0.0,
            entries: 0,
        }
    }

    pub fn fill(&mut self, x: f64, y: f64) {
        self.entries += 1;
        match (self.x.find(x), self.y.find(y)) {
            (Bin::In(i), Bin::In(j)) => self.contents[j * self.x.n_bins + i] += 1.0,
            _ => self.outside += 1.0,
        }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.contents[j * self.x.n_bins + i]
    }

    pub fn merge(&mut self, other: &Histogram2D) {
        debug_assert_eq!((self.x, self.y), (other.x, other.y));
        for (a, b) in self.contents.iter_mut().zip(other.contents.iter()) {
            *a += b;
        }
        self.outside += other.outside;
        self.entries += other.entries;
    }

    pub fn write(&self, w: &mut impl Write) -> std::io::Result<()> {
        let (x, y) = (&self.x, &self.y);
        writeln!(
            w,
            "# {} {} {} {} {} {} {}",
            self.name, x.n_bins, x.low, x.high, y.n_bins, y.low, y.high
        )?;
        writeln!(w, "# entries {} outside {}", self.entries, self.outside)?;
        for j in 0..y.n_bins {
            for i in 0..x.n_bins {
                writeln!(w, "{} {} {}", x.center(i), y.center(j), self.get(i, j))?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

const MULTIPLICITY: Binning = Binning::new(20, 0.0, 20.0);
const DELTA_R: Binning = Binning::new(20, 0.0, 0.4);
const TAU_MASS: Binning = Binning::new(20, 0.0, 2.0);
const MASS: Binning = Binning::new(100, 0.0, 10.0);

pub fn hypothesis_histogram(hypothesis: Hypothesis, with_gamma: bool) -> String {
    if with_gamma {
        format!("mass_{hypothesis}_gamma")
    } else {
        format!("mass_{hypothesis}")
    }
}

lazy_static! {
    static ref BOOKING_1D: Vec<(String, Binning)> = {
        let mut booking: Vec<(String, Binning)> = [
            ("tau_mass", TAU_MASS),
            ("tau_dm", Binning::new(20, 0.0, 20.0)),
            ("tau_gen", Binning::new(30, -15.0, 15.0)),
            ("tau_n_all_isocands", MULTIPLICITY),
            ("tau_n_chr_isocands", MULTIPLICITY),
            ("tau_n_ntr_isocands", MULTIPLICITY),
            ("tau_n_gam_isocands", MULTIPLICITY),
            ("tau_n_opposite", MULTIPLICITY),
            ("tau_n_same", MULTIPLICITY),
            ("tau_n_close_photons", MULTIPLICITY),
            ("tau_dR_chr_isocands", DELTA_R),
            ("iso_mass", MASS),
            ("iso_ch_mass", MASS),
            ("iso_ch_pdgs", Binning::new(1000, -500.0, 500.0)),
            ("close_photon_mass", Binning::new(50, 0.0, 5.0)),
            ("d0_window", Binning::new(2, 0.0, 2.0)),
        ]
        .into_iter()
        .map(|(name, b)| (name.to_string(), b))
        .collect();
        for h in Hypothesis::iter_variants() {
            booking.push((hypothesis_histogram(h, false), MASS));
            booking.push((hypothesis_histogram(h, true), MASS));
        }
        booking
    };
    static ref BOOKING_2D: Vec<(&'static str, Binning, Binning)> = vec![
        ("tau_dR_chr_isocands_pt", DELTA_R, Binning::new(20, 0.0, 50.0)),
        ("tau_dR_chr_isocands_charge", DELTA_R, Binning::new(4, -2.0, 2.0)),
        ("tau_mass_iso_ch_mass", TAU_MASS, Binning::new(20, 0.0, 5.0)),
        ("tau_mass_iso_ch_mass_os", TAU_MASS, Binning::new(20, 0.0, 5.0)),
        ("tau_mass_iso_ch_mass_ss", TAU_MASS, Binning::new(20, 0.0, 5.0)),
        ("iso_ch_char", Binning::new(10, -5.0, 5.0), Binning::new(4, -2.0, 2.0)),
    ];
}

/// Every analysis histogram, filled event by event.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSet {
    pub h1: BTreeMap<String, Histogram1D>,
    pub h2: BTreeMap<String, Histogram2D>,
}

impl Default for HistogramSet {
    fn default() -> Self {
        Self::book()
    }
}

impl HistogramSet {
    pub fn book() -> Self {
        let h1 = BOOKING_1D
            .iter()
            .map(|(name, b)| (name.clone(), Histogram1D::new(name, *b)))
            .collect();
        let h2 = BOOKING_2D
            .iter()
            .map(|(name, x, y)| (name.to_string(), Histogram2D::new(name, *x, *y)))
            .collect();
        HistogramSet { h1, h2 }
    }

    pub fn get_1d(&self, name: &str) -> Option<&Histogram1D> {
        self.h1.get(name)
    }

    pub fn get_2d(&self, name: &str) -> Option<&Histogram2D> {
        self.h2.get(name)
    }

    fn fill_1d(&mut self, name: &str, x: f64) {
        let h = self.h1.get_mut(name);
        debug_assert!(h.is_some(), "histogram {name} is not booked");
        if let Some(h) = h {
            h.fill(x);
        }
    }

    fn fill_2d(&mut self, name: &str, x: f64, y: f64) {
        let h = self.h2.get_mut(name);
        debug_assert!(h.is_some(), "histogram {name} is not booked");
        if let Some(h) = h {
            h.fill(x, y);
        }
    }

    /// Candidate multiplicities of the whole record, filled for every tau
    /// passing the preselection.
    pub fn fill_multiplicities(&mut self, record: &RecordCounts) {
        self.fill_1d("tau_n_all_isocands", record.total() as f64);
        self.fill_1d("tau_n_chr_isocands", record.charged as f64);
        self.fill_1d("tau_n_ntr_isocands", record.neutral as f64);
        self.fill_1d("tau_n_gam_isocands", record.photons as f64);
    }

    /// Everything but the multiplicities, for a selected tau.
    pub fn fill(&mut self, event: &Event, dressed: &DressedTau, gen_id: i32) {
        let cone = &event.cone;
        self.fill_1d("tau_mass", dressed.tau_mass);
        self.fill_1d("tau_dm", event.tau.decay_mode as f64);
        self.fill_1d("tau_gen", gen_id as f64);
        self.fill_1d("tau_n_opposite", dressed.n_opposite as f64);
        self.fill_1d("tau_n_same", dressed.n_same as f64);
        self.fill_1d("tau_n_close_photons", dressed.n_close_photons as f64);
        self.fill_1d("iso_mass", cone.total_momentum().mass());
        self.fill_1d("iso_ch_mass", dressed.charged_sum_mass);
        self.fill_1d("close_photon_mass", dressed.photon_mass);
        self.fill_1d("d0_window", if dressed.passes_d0_window { 1.0 } else { 0.0 });

        for c in &cone.charged {
            self.fill_1d("iso_ch_pdgs", c.pdg_id as f64);
        }
        for c in &dressed.charged {
            self.fill_2d("tau_mass_iso_ch_mass", dressed.tau_mass, c.pair_mass);
            self.fill_1d("tau_dR_chr_isocands", c.delta_r);
            self.fill_2d("tau_dR_chr_isocands_pt", c.delta_r, c.pt);
            let os = if c.opposite_sign { 1.0 } else { 0.0 };
            self.fill_2d("tau_dR_chr_isocands_charge", c.delta_r, os);
            let name = if c.opposite_sign {
                "tau_mass_iso_ch_mass_os"
            } else {
                "tau_mass_iso_ch_mass_ss"
            };
            self.fill_2d(name, dressed.tau_mass, c.pair_mass);
        }
        self.fill_2d(
            "iso_ch_char",
            dressed.charged_net_charge as f64,
            event.tau.charge as f64,
        );

        for h in Hypothesis::iter_variants() {
            let masses = dressed.masses(h);
            for &m in &masses.plain {
                self.fill_1d(&hypothesis_histogram(h, false), m);
            }
            for &m in &masses.with_gamma {
                self.fill_1d(&hypothesis_histogram(h, true), m);
            }
        }
    }

    pub fn merge(mut self, other: HistogramSet) -> Self {
        for (name, h) in &other.h1 {
            if let Some(mine) = self.h1.get_mut(name) {
                mine.merge(h);
            }
        }
        for (name, h) in &other.h2 {
            if let Some(mine) = self.h2.get_mut(name) {
                mine.merge(h);
            }
        }
        self
    }

    pub fn write(&self, w: &mut impl Write) -> std::io::Result<()> {
        for h in self.h1.values() {
            h.write(w)?;
        }
        for h in self.h2.values() {
            h.write(w)?;
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write(&mut w)?;
        w.flush()?;
        Ok(())
    }
}

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use tau_dressing::run::EventSummary;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Per decay mode observables from dressed-tau summaries")]
struct Cli {
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    #[arg(short, long, default_value = "observables.txt")]
    output: PathBuf,

    /// `summary.jsonl` files, each one is a jackknife sample
    #[arg(required = true)]
    summaries: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    pub events: f64,
    pub passing: f64,
    pub opposite: f64,
    pub same: f64,
    pub photons: f64,
}

impl Tally {
    pub fn add(&mut self, s: &EventSummary) {
        self.events += 1.0;
        if s.dressed.passes_d0_window {
            self.passing += 1.0;
        }
        self.opposite += s.dressed.n_opposite as f64;
        self.same += s.dressed.n_same as f64;
        self.photons += s.dressed.n_close_photons as f64;
    }
}

// def jackknife(fn, ns, ds):
//    n = sum(ns)
//    d = sum(ds)
//    value = fn(n, d)
//    l = len(ns)
//    if l > 1:
//       fs = [fn(n-ni, d-di) for ni, di in zip(ns,ds)]
//       fh = sum(fs)/l
//       vh = sum((f-fh)**2 for f in fs)/l
//       error2 = (l-1)*vh
//       return value, np.sqrt(error2)
//    else:
//       return value, 0

pub fn jacknife<F: Fn(f64, f64) -> f64>(f: F, aa: &[f64], bb: &[f64]) -> (f64, f64) {
    let a: f64 = aa.iter().sum();
    let b: f64 = bb.iter().sum();
    let val = f(a, b);
    let l = aa.len();
    if l > 1 {
        let fs: Vec<f64> = aa
            .iter()
            .zip(bb.iter())
            .map(|(ia, ib)| f(a - ia, b - ib))
            .collect();
        let fh = fs.iter().sum::<f64>() / l as f64;
        let vh = fs.iter().map(|f| (f - fh).powi(2)).sum::<f64>() / l as f64;
        let err = ((l - 1) as f64 * vh).sqrt();
        (val, err)
    } else {
        (val, 0.0)
    }
}

/// Tallies per decay mode, one entry per sample.
pub fn tally(samples: &[Vec<EventSummary>]) -> BTreeMap<i32, Vec<Tally>> {
    let mut modes: BTreeMap<i32, Vec<Tally>> = BTreeMap::new();
    for (k, sample) in samples.iter().enumerate() {
        for s in sample {
            let tallies = modes
                .entry(s.decay_mode)
                .or_insert_with(|| vec![Tally::default(); samples.len()]);
            tallies[k].add(s);
        }
    }
    modes
}

pub fn observables(modes: &BTreeMap<i32, Vec<Tally>>) -> String {
    let mut msg = vec![String::new(); 2];
    for (dm, tallies) in modes {
        let events: Vec<f64> = tallies.iter().map(|t| t.events).collect();
        let passing: Vec<f64> = tallies.iter().map(|t| t.passing).collect();
        let total: f64 = events.iter().sum();
        // a sample without events of this mode contributes 0/0 to its jackknife term
        let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };
        let (frac, errfrac) = jacknife(ratio, &passing, &events);
        msg[0] = format!(
            "{}d0-window|dm {}|{:.0}|{:.4}:{:.4}\n",
            msg[0], dm, total, frac, errfrac
        );

        let mean = |f: fn(&Tally) -> f64| ratio(tallies.iter().map(f).sum(), total);
        msg[1] = format!(
            "{}multiplicity|dm {}|{:.2} {:.2} {:.2}\n",
            msg[1],
            dm,
            mean(|t| t.opposite),
            mean(|t| t.same),
            mean(|t| t.photons)
        );
    }
    msg.join("\n")
}

fn load_summaries(path: &PathBuf) -> Result<Vec<EventSummary>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut summaries = vec![];
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let s: EventSummary = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", path.display(), i + 1))?;
        summaries.push(s);
    }
    debug!("{} summaries in {}", summaries.len(), path.display());
    Ok(summaries)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    let samples = cli
        .summaries
        .iter()
        .map(load_summaries)
        .collect::<Result<Vec<_>>>()?;
    info!("{} samples loaded", samples.len());

    let msg = observables(&tally(&samples));
    println!("{}", msg);
    std::fs::write(&cli.output, msg)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    Ok(())
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Host counter frequency, 1 GHz.
const PHAT: f64 = 1e-9;
const POLL_PERIOD_S: f64 = 16.0;
const START_EPOCH_S: f64 = 1_330_000_000.0;
const SAMPLES: usize = 512;
/// Host counter value at `START_EPOCH_S`.
const COUNTER_ORIGIN: u64 = 3_000_000_000_000;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Exponential delay with the given mean, as queueing adds to a path.
    fn queueing(&mut self, mean: f64) -> f64 {
        -mean * (1.0 - self.next_f64()).ln()
    }
}

/// One NTP exchange as seen by the host counter and the capture card.
struct Exchange {
    ta: u64,
    tf: u64,
    tb: f64,
    te: f64,
    dag_tx: f64,
    dag_rx: f64,
}

fn simulate(rng: &mut SimpleRng) -> Vec<Exchange> {
    let mut exchanges = Vec::with_capacity(SAMPLES);
    for i in 0..SAMPLES {
        let sent = START_EPOCH_S + 1.0 + i as f64 * POLL_PERIOD_S + rng.gauss(0.0, 1e-3);
        // host stack and wire, out and back
        let host_out = 15e-6 + rng.queueing(5e-6);
        let path_out = 180e-6 + rng.queueing(40e-6);
        let server = 30e-6 + rng.queueing(10e-6);
        let path_back = 180e-6 + rng.queueing(40e-6);
        let host_back = 15e-6 + rng.queueing(5e-6);

        let dag_tx = sent + host_out;
        let tb = dag_tx + path_out;
        let te = tb + server;
        let dag_rx = te + path_back;
        let received = dag_rx + host_back;

        let ticks = |t: f64| COUNTER_ORIGIN + ((t - START_EPOCH_S) / PHAT).round() as u64;
        exchanges.push(Exchange {
            ta: ticks(sent),
            tf: ticks(received),
            tb,
            te,
            dag_tx,
            dag_rx,
        });
    }
    exchanges
}

fn create(path: &Path) -> anyhow::Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_radclock(path: &Path, exchanges: &[Exchange], rng: &mut SimpleRng) -> anyhow::Result<()> {
    let mut out = create(path)?;
    writeln!(out, "% description: synthetic radclock stamps")?;
    writeln!(out, "% type: radclock")?;
    writeln!(out, "% version: 3")?;
    writeln!(out, "% fields: Ta Tb Te Tf RTT stamp phat")?;
    for ex in exchanges {
        let rtt = ex.tf - ex.ta;
        let stamp = START_EPOCH_S + (ex.tf - COUNTER_ORIGIN) as f64 * PHAT;
        let phat = PHAT * (1.0 + rng.gauss(0.0, 1e-7));
        writeln!(
            out,
            "{} {:.9} {:.9} {} {} {:.6} {:.15e}",
            ex.ta, ex.tb, ex.te, ex.tf, rtt, stamp, phat
        )?;
    }
    // interrupted write
    write!(out, "{} {:.9}", exchanges.len(), START_EPOCH_S)?;
    out.flush()?;
    Ok(())
}

fn write_capture(path: &Path, exchanges: &[Exchange]) -> anyhow::Result<()> {
    let mut out = create(path)?;
    writeln!(out, "% description: synthetic capture stamps matched to radclock")?;
    writeln!(out, "% type: RAD_merged")?;
    writeln!(out, "% version: 1")?;
    writeln!(out, "% fields: Ta Tb Te Tf DAG_TX DAG_RX")?;
    // the capture side misses the first exchange
    for (i, ex) in exchanges.iter().enumerate().skip(1) {
        // a few packets the radclock never saw
        let tf = if i % 97 == 0 { ex.tf + 1 } else { ex.tf };
        writeln!(
            out,
            "{} {:.9} {:.9} {} {:.9} {:.9}",
            ex.ta, ex.tb, ex.te, tf, ex.dag_tx, ex.dag_rx
        )?;
    }
    write!(out, "0 0")?;
    out.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let exchanges = simulate(&mut rng);

    let radclock = dir.join("radclock.dat");
    let capture = dir.join("rad_merged.dat");
    write_radclock(&radclock, &exchanges, &mut rng)?;
    write_capture(&capture, &exchanges)?;

    println!(
        "Wrote {} exchanges to {} and {}",
        exchanges.len(),
        radclock.display(),
        capture.display()
    );
    Ok(())
}

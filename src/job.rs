use crate::average;
use crate::config::{Config, Weighting};
use crate::weights::{self, VariableParameters};
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Averaging job.
///
/// Resolves the weighting of a validated [`Config`] and runs the averaging
/// routines over its vectors.
pub struct Job {
    cfg: Config,
}

/// Result of running a [`Job`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Length of each vector.
    pub n: usize,
    /// Number of averaged vectors.
    pub n_vectors: usize,
    /// Weight of each vector, if the average was weighted.
    pub weights: Option<Vec<f64>>,
    /// Element-wise means, NaN where undefined.
    pub means: Vec<f64>,
}

impl Job {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    /// Load and validate the job described by a TOML file.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let cfg = Config::from_file(file).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");
        Ok(Self::new(cfg))
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Weight of each vector, or `None` for a plain average.
    pub fn resolve_weights(&self) -> Option<Vec<f64>> {
        match &self.cfg.weighting {
            Weighting::None => None,
            Weighting::Explicit { weights } => Some(weights.clone()),
            Weighting::Blocks {
                sizes,
                policy,
                lower_bound,
                upper_bound,
            } => {
                let variable = VariableParameters::new(*lower_bound, *upper_bound);
                Some(weights::compute(sizes, *policy, &variable))
            }
        }
    }

    /// Average the vectors of the job.
    pub fn run(&self) -> Report {
        let n = self.cfg.n();
        let inputs: Vec<&[f64]> = self.cfg.vectors.iter().map(Vec::as_slice).collect();
        let skip_nan = self.cfg.skip_nan;

        let weights = self.resolve_weights();
        let means: Vec<f64> = match &weights {
            None => average::compute_vec(n, &inputs, skip_nan),
            Some(weights) => average::compute_weighted_vec(n, &inputs, weights, skip_nan),
        };

        let n_undefined = means.iter().filter(|mean| mean.is_nan()).count();
        log::info!(
            "averaged {} vectors of length {n} ({n_undefined} undefined elements)",
            inputs.len()
        );

        Report {
            n,
            n_vectors: inputs.len(),
            weights,
            means,
        }
    }
}

impl Report {
    /// Save the report to a MessagePack-encoded file.
    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize report")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a report previously written by [`Report::save`].
    pub fn load<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let report = decode::from_read(&mut reader).context("failed to deserialize report")?;
        Ok(report)
    }
}

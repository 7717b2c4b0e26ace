use crate::weights::{Policy, VariableParameters};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Maximum number of vectors accepted in a single job.
const MAX_N_VECTORS: usize = 1_000_000;

/// Averaging job description.
///
/// Loaded from a TOML file and validated before use, so that the averaging
/// routines only ever see inputs of matching lengths and sane weights.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whether NaNs are ignored when averaging each element.
    #[serde(default)]
    pub skip_nan: bool,

    /// Input vectors, all of the same length.
    pub vectors: Vec<Vec<f64>>,

    /// How each vector is weighted.
    #[serde(default)]
    pub weighting: Weighting,
}

/// Weighting of the input vectors.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Weighting {
    /// Plain average.
    #[default]
    None,
    /// One explicit weight per vector.
    Explicit { weights: Vec<f64> },
    /// Weights derived from the size of the block each vector summarizes.
    Blocks {
        sizes: Vec<f64>,
        policy: Policy,
        #[serde(default = "default_lower_bound")]
        lower_bound: f64,
        #[serde(default = "default_upper_bound")]
        upper_bound: f64,
    },
}

fn default_lower_bound() -> f64 {
    VariableParameters::default().lower_bound
}

fn default_upper_bound() -> f64 {
    VariableParameters::default().upper_bound
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the job is invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        Self::from_toml_str(&contents).with_context(|| format!("failed to load {file:?}"))
    }

    /// Parse and validate a [`Config`] from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Length of each input vector.
    pub fn n(&self) -> usize {
        self.vectors.first().map_or(0, Vec::len)
    }

    fn validate(&self) -> Result<()> {
        let n_vectors = self.vectors.len();
        check_num(n_vectors, 1..=MAX_N_VECTORS).context("invalid number of vectors")?;

        let n = self.n();
        for (i_vec, vec) in self.vectors.iter().enumerate() {
            check_len(vec, n).with_context(|| format!("invalid vector {i_vec}"))?;
        }

        match &self.weighting {
            Weighting::None => {}
            Weighting::Explicit { weights } => {
                check_vec(weights, n_vectors).context("invalid weights")?;
            }
            Weighting::Blocks {
                sizes,
                lower_bound,
                upper_bound,
                ..
            } => {
                check_vec(sizes, n_vectors).context("invalid block sizes")?;
                check_finite(*upper_bound).context("invalid upper bound")?;
                check_num(*lower_bound, 0.0..=*upper_bound).context("invalid lower bound")?;
            }
        }

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_finite(num: f64) -> Result<()> {
    if !num.is_finite() {
        bail!("number must be finite, but is {num}");
    }
    Ok(())
}

fn check_len(vec: &[f64], exp_len: usize) -> Result<()> {
    let len = vec.len();
    if len != exp_len {
        bail!("vector length must be {exp_len}, but is {len}");
    }
    Ok(())
}

fn check_vec(vec: &[f64], exp_len: usize) -> Result<()> {
    check_len(vec, exp_len)?;
    // Weights and sizes: finite and non-negative.
    for (i_ele, &ele) in vec.iter().enumerate() {
        check_finite(ele).with_context(|| format!("invalid element {i_ele}"))?;
        if ele < 0.0 {
            bail!("vector must have only non-negative elements, but element {i_ele} is {ele}");
        }
    }
    Ok(())
}

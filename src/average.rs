//! Element-wise averaging across parallel vectors.
//!
//! Every vector in the input set has the same length `n` as the output slice.
//! Each output element is the (optionally weighted) mean of the elements at the
//! same index across all vectors. An undefined mean is reported as NaN in the
//! output rather than as an error, so a single output can mix valid and
//! undefined positions.

use num_traits::{AsPrimitive, Float, Zero};

/// How each input vector contributes to the mean.
#[derive(Clone, Copy)]
enum Mode<'a, O> {
    Unweighted,
    /// One weight per input vector, already converted to the output type.
    Weighted(&'a [O]),
}

/// Average parallel elements across multiple vectors.
///
/// On return, `out[i]` holds the mean of `inputs[k][i]` over all `k`.
/// Every vector in `inputs` must have the same length as `out`.
///
/// If `skip_nan` is set, NaNs are ignored when averaging each element, at the
/// cost of some efficiency. A position where every input is NaN is undefined
/// (with IEEE floats it is NaN, being `0 / 0`).
///
/// An empty `inputs` fills `out` with NaN.
pub fn compute<S, O>(inputs: &[&[S]], out: &mut [O], skip_nan: bool)
where
    S: AsPrimitive<O>,
    O: Float + 'static,
{
    accumulate_all(inputs, Mode::Unweighted, out, skip_nan);
}

/// Allocating variant of [`compute`] returning a new vector of length `n`.
pub fn compute_vec<S, O>(n: usize, inputs: &[&[S]], skip_nan: bool) -> Vec<O>
where
    S: AsPrimitive<O>,
    O: Float + 'static,
{
    let mut out = vec![O::zero(); n];
    compute(inputs, &mut out, skip_nan);
    out
}

/// Weighted average of parallel elements across multiple vectors.
///
/// `weights` holds one weight per vector in `inputs`. Weights should be
/// non-negative and finite; a zero weight excludes its vector entirely, both
/// from the sum and from the NaN-skipping denominator.
///
/// When all weights are equal the unweighted algorithm is used, as a common
/// scale factor cancels out. If that common weight is zero, `out` is filled
/// with NaN.
///
/// Equality is checked on the weights as given, while zero and unit weights
/// are detected after conversion to `O`, so a weight that underflows to zero
/// in `O` excludes its vector.
pub fn compute_weighted<S, W, O>(inputs: &[&[S]], weights: &[W], out: &mut [O], skip_nan: bool)
where
    S: AsPrimitive<O>,
    W: AsPrimitive<O> + PartialEq + Zero,
    O: Float + 'static,
{
    debug_assert_eq!(
        weights.len(),
        inputs.len(),
        "expected one weight per input vector"
    );

    if !inputs.is_empty() {
        let first = weights[0];
        if weights.iter().all(|&weight| weight == first) {
            if first.is_zero() {
                log::trace!("all weights are zero, mean is undefined");
                out.fill(O::nan());
            } else {
                log::trace!("all weights are equal, using unweighted average");
                compute(inputs, out, skip_nan);
            }
            return;
        }
    }

    let weights: Vec<O> = weights.iter().map(|&weight| weight.as_()).collect();
    accumulate_all(inputs, Mode::Weighted(&weights), out, skip_nan);
}

/// Allocating variant of [`compute_weighted`] returning a new vector of length `n`.
pub fn compute_weighted_vec<S, W, O>(
    n: usize,
    inputs: &[&[S]],
    weights: &[W],
    skip_nan: bool,
) -> Vec<O>
where
    S: AsPrimitive<O>,
    W: AsPrimitive<O> + PartialEq + Zero,
    O: Float + 'static,
{
    let mut out = vec![O::zero(); n];
    compute_weighted(inputs, weights, &mut out, skip_nan);
    out
}

fn accumulate_all<S, O>(inputs: &[&[S]], mode: Mode<'_, O>, out: &mut [O], skip_nan: bool)
where
    S: AsPrimitive<O>,
    O: Float + 'static,
{
    let n = out.len();
    debug_assert!(
        inputs.iter().all(|vec| vec.len() == n),
        "every input vector must have the output length {n}"
    );

    match inputs {
        [] => {
            out.fill(O::nan());
            return;
        }
        [vec] => {
            let excluded = match mode {
                Mode::Unweighted => false,
                Mode::Weighted(weights) => weights[0].is_zero(),
            };
            if excluded {
                out.fill(O::nan());
            } else {
                for (ele, &val) in out.iter_mut().zip(vec.iter()) {
                    *ele = val.as_();
                }
            }
            return;
        }
        _ => {}
    }

    out.fill(O::zero());
    let mut acc_weight = if skip_nan { vec![O::zero(); n] } else { Vec::new() };
    let mut total_weight = O::zero();

    for (i_vec, vec) in inputs.iter().enumerate() {
        let weight = match mode {
            Mode::Unweighted => O::one(),
            Mode::Weighted(weights) => weights[i_vec],
        };

        if weight.is_zero() {
            continue;
        }
        total_weight = total_weight + weight;

        // A unit weight skips the multiplication.
        if weight != O::one() {
            accumulate(vec, out, &mut acc_weight, weight, skip_nan, |val| val * weight);
        } else {
            accumulate(vec, out, &mut acc_weight, weight, skip_nan, |val| val);
        }
    }

    if skip_nan {
        for (ele, &acc) in out.iter_mut().zip(&acc_weight) {
            *ele = *ele / acc;
        }
    } else {
        let denom = total_weight.recip();
        for ele in out.iter_mut() {
            *ele = *ele * denom;
        }
    }
}

/// Add one (scaled) vector into the running sums.
#[inline(always)]
fn accumulate<S, O, F>(
    vec: &[S],
    out: &mut [O],
    acc_weight: &mut [O],
    weight: O,
    skip_nan: bool,
    scale: F,
) where
    S: AsPrimitive<O>,
    O: Float + 'static,
    F: Fn(O) -> O,
{
    if skip_nan {
        for ((ele, acc), &val) in out.iter_mut().zip(acc_weight.iter_mut()).zip(vec) {
            let val = scale(val.as_());
            if !val.is_nan() {
                *ele = *ele + val;
                *acc = *acc + weight;
            }
        }
    } else {
        for (ele, &val) in out.iter_mut().zip(vec) {
            *ele = *ele + scale(val.as_());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha12Rng;
    use rand_distr::{Distribution, Normal};

    fn assert_same(result: &[f64], expected: &[f64]) {
        assert_eq!(result.len(), expected.len());
        for (i, (&res, &exp)) in result.iter().zip(expected).enumerate() {
            assert!(
                res == exp || (res.is_nan() && exp.is_nan()),
                "element {i}: expected {exp}, got {res}"
            );
        }
    }

    fn random_vecs(rng: &mut ChaCha12Rng, n_vec: usize, n: usize) -> Vec<Vec<f64>> {
        let dist = Normal::new(10.0, 5.0).expect("valid normal parameters");
        let mut vecs = Vec::with_capacity(n_vec);
        for _ in 0..n_vec {
            let vec: Vec<f64> = (0..n).map(|_| dist.sample(&mut *rng)).collect();
            vecs.push(vec);
        }
        vecs
    }

    fn as_slices(vecs: &[Vec<f64>]) -> Vec<&[f64]> {
        vecs.iter().map(|vec| vec.as_slice()).collect()
    }

    #[test]
    fn empty_input_is_nan() {
        let inputs: Vec<&[f64]> = Vec::new();
        for n in [0, 1, 7] {
            let out: Vec<f64> = compute_vec(n, &inputs, false);
            assert_eq!(out.len(), n);
            assert!(out.iter().all(|val| val.is_nan()));

            let out: Vec<f64> = compute_weighted_vec(n, &inputs, &[] as &[f64], true);
            assert!(out.iter().all(|val| val.is_nan()));
        }
    }

    #[test]
    fn single_input_is_copied() {
        let vec = [1.5, f64::NAN, -3.0, 0.0];
        let inputs = [&vec[..]];

        for skip_nan in [false, true] {
            let out: Vec<f64> = compute_vec(vec.len(), &inputs, skip_nan);
            assert_same(&out, &vec);

            let out: Vec<f64> = compute_weighted_vec(vec.len(), &inputs, &[0.25], skip_nan);
            assert_same(&out, &vec);

            let out: Vec<f64> = compute_weighted_vec(vec.len(), &inputs, &[0.0], skip_nan);
            assert!(out.iter().all(|val| val.is_nan()));
        }
    }

    #[test]
    fn unweighted_average() {
        let a = [2.0, 4.0, 6.0];
        let b = [4.0, 6.0, 8.0];
        let out: Vec<f64> = compute_vec(3, &[&a[..], &b[..]], false);
        assert_eq!(out, vec![3.0, 5.0, 7.0]);

        let mut out = [0.0_f64; 3];
        compute(&[&a[..], &b[..]], &mut out, true);
        assert_eq!(out, [3.0, 5.0, 7.0]);
    }

    #[test]
    fn weighted_average() {
        let a = [2.0, 4.0, 6.0];
        let b = [4.0, 6.0, 8.0];
        for skip_nan in [false, true] {
            let inputs = [&a[..], &b[..]];
            let out: Vec<f64> = compute_weighted_vec(3, &inputs, &[1.0, 3.0], skip_nan);
            assert_eq!(out, vec![3.5, 5.5, 7.5]);
        }
    }

    #[test]
    fn weighted_average_with_integer_types() {
        let a = [2_i32, 4, 6];
        let b = [4_i32, 6, 8];
        let out: Vec<f64> = compute_weighted_vec(3, &[&a[..], &b[..]], &[1_u32, 3], false);
        assert_eq!(out, vec![3.5, 5.5, 7.5]);

        let out: Vec<f32> = compute_vec(3, &[&a[..], &b[..]], false);
        assert_eq!(out, vec![3.0_f32, 5.0, 7.0]);
    }

    #[test]
    fn zero_weights_are_nan() {
        let a = [1.0, 2.0];
        let b = [3.0, 4.0];
        let c = [5.0, 6.0];
        let inputs = [&a[..], &b[..], &c[..]];

        let out: Vec<f64> = compute_weighted_vec(2, &inputs[..2], &[0.0, 0.0], false);
        assert!(out.iter().all(|val| val.is_nan()));

        let out: Vec<f64> = compute_weighted_vec(2, &inputs, &[0.0, 0.0, 0.0], true);
        assert!(out.iter().all(|val| val.is_nan()));
    }

    #[test]
    fn zero_weight_excludes_vector() {
        let a = [1.0, 2.0];
        let b = [100.0, f64::NAN];
        let c = [3.0, 4.0];
        let inputs = [&a[..], &b[..], &c[..]];
        let out: Vec<f64> = compute_weighted_vec(2, &inputs, &[1.0, 0.0, 1.0], false);
        assert_eq!(out, vec![2.0, 3.0]);
    }

    #[test]
    fn nan_propagates_without_skipping() {
        let a = [1.0, f64::NAN];
        let b = [3.0, 5.0];
        let out: Vec<f64> = compute_vec(2, &[&a[..], &b[..]], false);
        assert_eq!(out[0], 2.0);
        assert!(out[1].is_nan());
    }

    #[test]
    fn nan_skipping() {
        let a = [1.0, f64::NAN];
        let b = [3.0, 5.0];
        let out: Vec<f64> = compute_vec(2, &[&a[..], &b[..]], true);
        assert_eq!(out, vec![2.0, 5.0]);
    }

    #[test]
    fn nan_skipping_with_weights() {
        let a = [1.0, f64::NAN, 2.0];
        let b = [3.0, 5.0, f64::NAN];
        let out: Vec<f64> = compute_weighted_vec(3, &[&a[..], &b[..]], &[1.0, 3.0], true);
        assert_eq!(out, vec![2.5, 5.0, 2.0]);
    }

    #[test]
    fn nan_skipping_ignores_zero_weight_vectors() {
        let a = [f64::NAN, 4.0, f64::NAN];
        let b = [8.0, 8.0, f64::NAN];
        let c = [2.0, 2.0, 2.0];
        let inputs = [&a[..], &b[..], &c[..]];
        let out: Vec<f64> = compute_weighted_vec(3, &inputs, &[2.0, 0.0, 1.0], true);
        // Only `a` (weight 2) and `c` (weight 1) may count towards each position.
        assert_eq!(out, vec![2.0, 10.0 / 3.0, 2.0]);
    }

    #[test]
    fn nan_skipping_without_valid_values() {
        let a = [f64::NAN, 1.0];
        let b = [f64::NAN, 3.0];
        let out: Vec<f64> = compute_vec(2, &[&a[..], &b[..]], true);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 2.0);
    }

    #[test]
    fn equal_weights_match_unweighted() {
        let mut rng = ChaCha12Rng::seed_from_u64(42);
        for _ in 0..50 {
            let n_vec = rng.random_range(1..8);
            let n = rng.random_range(0..20);
            let mut vecs = random_vecs(&mut rng, n_vec, n);
            for vec in vecs.iter_mut() {
                for val in vec.iter_mut() {
                    if rng.random_bool(0.1) {
                        *val = f64::NAN;
                    }
                }
            }
            let inputs = as_slices(&vecs);
            let weight = rng.random_range(0.1..10.0);
            let weights = vec![weight; n_vec];

            for skip_nan in [false, true] {
                let unweighted: Vec<f64> = compute_vec(n, &inputs, skip_nan);
                let weighted: Vec<f64> = compute_weighted_vec(n, &inputs, &weights, skip_nan);
                assert_same(&weighted, &unweighted);
            }
        }
    }

    #[test]
    fn replicated_vectors_average_to_themselves() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let vec = random_vecs(&mut rng, 1, 25).remove(0);

        for skip_nan in [false, true] {
            for n_rep in [1, 2] {
                let inputs = vec![vec.as_slice(); n_rep];
                let out: Vec<f64> = compute_vec(vec.len(), &inputs, skip_nan);
                assert_same(&out, &vec);
            }

            for n_rep in [3, 5, 8, 13] {
                let inputs = vec![vec.as_slice(); n_rep];
                let out: Vec<f64> = compute_vec(vec.len(), &inputs, skip_nan);
                for (&res, &exp) in out.iter().zip(&vec) {
                    assert!((res - exp).abs() <= 1e-12 * exp.abs().max(1.0));
                }
            }
        }
    }

    #[test]
    fn output_does_not_depend_on_buffer_contents() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let vecs = random_vecs(&mut rng, 4, 16);
        let inputs = as_slices(&vecs);
        let weights = [0.5, 2.0, 0.0, 1.0];

        let mut out_a = vec![f64::NAN; 16];
        let mut out_b = vec![123.0_f64; 16];
        compute_weighted(&inputs, &weights, &mut out_a, true);
        compute_weighted(&inputs, &weights, &mut out_b, true);

        let bits_a: Vec<u64> = out_a.iter().map(|val| val.to_bits()).collect();
        let bits_b: Vec<u64> = out_b.iter().map(|val| val.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }
}

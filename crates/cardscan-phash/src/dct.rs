use nalgebra::DMatrix;

/// First `keep` rows of the unnormalized DCT-II basis of length `n`:
/// `y[k] = 2 * sum_i x[i] * cos(pi * k * (2i + 1) / (2n))`.
pub(crate) fn dct2_basis(keep: usize, n: usize) -> DMatrix<f64> {
    let scale = std::f64::consts::PI / (2.0 * n as f64);
    DMatrix::from_fn(keep, n, |k, i| {
        2.0 * (scale * k as f64 * (2 * i + 1) as f64).cos()
    })
}

/// Low-frequency corner of the separable 2D DCT-II (columns, then rows).
///
/// `basis` must come from [`dct2_basis`] with `n` equal to both sides of
/// `pixels`; the result is `keep x keep`.
pub(crate) fn dct2_low(pixels: &DMatrix<f64>, basis: &DMatrix<f64>) -> DMatrix<f64> {
    basis * pixels * basis.transpose()
}

/// Median with the two middle values averaged for even lengths.
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

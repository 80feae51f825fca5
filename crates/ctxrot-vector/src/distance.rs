/// Squared Euclidean distance, accumulated in `f64`.
///
/// Storage stays `f32`; widening each difference before squaring keeps
/// near-duplicate vectors from swapping rank through rounding.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

/// Evaluates the cubic Lagrange polynomial through the four samples that
/// bracket `t`, i.e. `times[m-2..=m+1]` with `times[m-1] < t <= times[m]`.
///
/// Returns `None` when `t` is not bracketed with a full stencil on both sides.
pub fn lagrange4(times: &[f64], values: &[f64], t: f64) -> Option<f64> {
    let n = times.len().min(values.len());
    if n < 4 {
        return None;
    }
    let m = (2..n - 1).find(|&m| times[m - 1] < t && t <= times[m])?;
    let origin = times[0];
    let xs = &times[m - 2..m + 2];
    let ys = &values[m - 2..m + 2];
    let x = t - origin;

    let mut total = 0.0;
    for j in 0..4 {
        let xj = xs[j] - origin;
        let mut basis = 1.0;
        for k in 0..4 {
            if k != j {
                let xk = xs[k] - origin;
                basis *= (x - xk) / (xj - xk);
            }
        }
        total += ys[j] * basis;
    }
    Some(total)
}

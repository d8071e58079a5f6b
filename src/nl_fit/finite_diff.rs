/// Central finite-difference gradient
///
/// The step is scaled with the parameter magnitude, `eps^(1/3) max(|x_i|, 1)`, which balances
/// truncation and round-off errors. Returns the function value at `x`.
pub fn central_difference<F, const NPARAMS: usize>(
    f: F,
    x: &[f64; NPARAMS],
    grad: &mut [f64; NPARAMS],
) -> f64
where
    F: Fn(&[f64; NPARAMS]) -> f64,
{
    let step_scale = f64::EPSILON.cbrt();
    let mut shifted = *x;
    for (i, g) in grad.iter_mut().enumerate() {
        let h = step_scale * x[i].abs().max(1.0);
        shifted[i] = x[i] + h;
        let plus = f(&shifted);
        shifted[i] = x[i] - h;
        let minus = f(&shifted);
        shifted[i] = x[i];
        *g = (plus - minus) / (2.0 * h);
    }
    f(x)
}

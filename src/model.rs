use crate::error::LpplError;

use macro_const::macro_const;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Number of LPPL parameters
pub const NPARAMS: usize = 7;

macro_const! {
    const DOC: &str = r#"
Log-periodic power law

Predicted log-price as a function of elapsed time $t$:

$$
y(t) = A + B (t_c - t)^m \left[1 + C \cos\left(\omega \ln(t_c - t) + \phi\right)\right],
$$

for $t < t_c$ and $y(t) = A$ for $t \geq t_c$, where the power-law and the oscillatory terms
are degenerate.

Parameters are ordered as $(t_c, m, \omega, A, B, C, \phi)$.
"#;
}

#[doc = DOC!()]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LpplParams {
    /// Critical time, in days since the first observation
    pub tc: f64,
    /// Power-law exponent
    pub m: f64,
    /// Angular log-periodic frequency
    pub omega: f64,
    /// Log-price at the critical time
    pub a: f64,
    /// Power-law amplitude
    pub b: f64,
    /// Relative oscillation amplitude
    pub c: f64,
    /// Oscillation phase
    pub phi: f64,
}

impl LpplParams {
    pub fn new(tc: f64, m: f64, omega: f64, a: f64, b: f64, c: f64, phi: f64) -> Self {
        Self {
            tc,
            m,
            omega,
            a,
            b,
            c,
            phi,
        }
    }

    /// Predicted log-price at elapsed time `t`
    #[inline]
    pub fn value(&self, t: f64) -> f64 {
        lppl(t, &self.to_array())
    }

    #[inline]
    pub fn to_array(&self) -> [f64; NPARAMS] {
        [
            self.tc, self.m, self.omega, self.a, self.b, self.c, self.phi,
        ]
    }

    pub fn names() -> [&'static str; NPARAMS] {
        ["tc", "m", "omega", "A", "B", "C", "phi"]
    }

    pub fn descriptions() -> [&'static str; NPARAMS] {
        [
            "critical time in days since the first observation (tc)",
            "power-law exponent (m)",
            "angular log-periodic frequency (omega)",
            "log-price at the critical time (A)",
            "power-law amplitude (B)",
            "relative amplitude of log-periodic oscillations (C)",
            "phase of log-periodic oscillations (phi)",
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|x| x.is_finite())
    }

    pub fn doc() -> &'static str {
        DOC
    }
}

impl From<[f64; NPARAMS]> for LpplParams {
    fn from(p: [f64; NPARAMS]) -> Self {
        Self::new(p[0], p[1], p[2], p[3], p[4], p[5], p[6])
    }
}

impl From<LpplParams> for [f64; NPARAMS] {
    fn from(p: LpplParams) -> Self {
        p.to_array()
    }
}

impl TryFrom<&[f64]> for LpplParams {
    type Error = LpplError;

    fn try_from(value: &[f64]) -> Result<Self, Self::Error> {
        let array: [f64; NPARAMS] = value
            .try_into()
            .map_err(|_| LpplError::WrongParameterCount {
                actual: value.len(),
            })?;
        Ok(array.into())
    }
}

struct Params<'a> {
    p: &'a [f64; NPARAMS],
}

impl Params<'_> {
    #[inline]
    fn tc(&self) -> f64 {
        self.p[0]
    }

    #[inline]
    fn m(&self) -> f64 {
        self.p[1]
    }

    #[inline]
    fn omega(&self) -> f64 {
        self.p[2]
    }

    #[inline]
    fn a(&self) -> f64 {
        self.p[3]
    }

    #[inline]
    fn b(&self) -> f64 {
        self.p[4]
    }

    #[inline]
    fn c(&self) -> f64 {
        self.p[5]
    }

    #[inline]
    fn phi(&self) -> f64 {
        self.p[6]
    }
}

/// LPPL log-price at elapsed time `t`
///
/// At and beyond the critical time the model is clamped to `A`.
#[inline]
pub fn lppl(t: f64, param: &[f64; NPARAMS]) -> f64 {
    let x = Params { p: param };
    let dt = x.tc() - t;
    if dt <= 0.0 {
        return x.a();
    }
    let phase = x.omega() * dt.ln() + x.phi();
    x.a() + x.b() * dt.powf(x.m()) * (1.0 + x.c() * phase.cos())
}

/// Partial derivatives of [lppl] over its parameters
pub fn lppl_derivatives(t: f64, param: &[f64; NPARAMS], jac: &mut [f64; NPARAMS]) {
    let x = Params { p: param };
    let dt = x.tc() - t;
    if dt <= 0.0 {
        *jac = [0.0; NPARAMS];
        jac[3] = 1.0;
        return;
    }
    let ln_dt = dt.ln();
    let dt_m = dt.powf(x.m());
    let phase = x.omega() * ln_dt + x.phi();
    let (sin, cos) = phase.sin_cos();
    let osc = 1.0 + x.c() * cos;
    let b_dt_m = x.b() * dt_m;

    // tc
    jac[0] = x.b() * dt_m / dt * (x.m() * osc - x.c() * x.omega() * sin);
    // m
    jac[1] = b_dt_m * ln_dt * osc;
    // omega
    jac[2] = -b_dt_m * x.c() * sin * ln_dt;
    // A
    jac[3] = 1.0;
    // B
    jac[4] = dt_m * osc;
    // C
    jac[5] = b_dt_m * cos;
    // phi
    jac[6] = -b_dt_m * x.c() * sin;
}

#[cfg(test)]
#[allow(clippy::unreadable_literal)]
mod tests {
    use super::*;
    use crate::tests::*;

    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const PARAM: [f64; NPARAMS] = [120.0, 0.7, 8.0, 5.0, -0.2, 0.1, 0.3];

    #[test]
    fn lppl_clamped_at_and_beyond_tc() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            let mut param = PARAM;
            // Everything but tc and A is irrelevant beyond the critical time
            for i in [1, 2, 4, 5, 6] {
                param[i] = rng.random_range(-100.0..100.0);
            }
            let dt = rng.random_range(0.0..1000.0);
            assert_eq!(lppl(param[0] + dt, &param), param[3]);
        }
        assert_eq!(lppl(PARAM[0], &PARAM), PARAM[3]);
    }

    #[test]
    fn lppl_converges_to_a_near_tc() {
        let tc = PARAM[0];
        let distances: Vec<_> = [1.0, 1e-2, 1e-4, 1e-6, 1e-8]
            .iter()
            .map(|&eps| (lppl(tc - eps, &PARAM) - PARAM[3]).abs())
            .collect();
        assert!(distances.windows(2).all(|w| w[1] < w[0]), "{distances:?}");
        assert_abs_diff_eq!(lppl(tc - 1e-12, &PARAM), PARAM[3], epsilon = 1e-8);
    }

    #[test]
    fn lppl_finite_before_tc() {
        let t = linspace(0.0, PARAM[0] - 1e-9, 1000);
        assert!(t.iter().all(|&t| lppl(t, &PARAM).is_finite()));
    }

    #[test]
    fn lppl_known_value() {
        // dt = 100, phase = 8 ln(100) + 0.3
        let phase = 8.0 * 100.0_f64.ln() + 0.3;
        let desired = 5.0 - 0.2 * 100.0_f64.powf(0.7) * (1.0 + 0.1 * phase.cos());
        assert_relative_eq!(lppl(20.0, &PARAM), desired, max_relative = 1e-14);
        assert_relative_eq!(
            LpplParams::from(PARAM).value(20.0),
            desired,
            max_relative = 1e-14
        );
    }

    #[test]
    fn lppl_derivatives_match_finite_differences() {
        const REPEAT: usize = 20;
        const H: f64 = 1e-6;

        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..REPEAT {
            let t = rng.random_range(0.0..80.0);
            let param = {
                let mut param = PARAM;
                for x in param.iter_mut() {
                    *x *= rng.random_range(0.8..1.2);
                }
                param
            };
            let actual = {
                let mut jac = [0.0; NPARAMS];
                lppl_derivatives(t, &param, &mut jac);
                jac
            };
            let desired: Vec<_> = (0..NPARAMS)
                .map(|i| {
                    let mut plus = param;
                    let mut minus = param;
                    plus[i] += H;
                    minus[i] -= H;
                    (lppl(t, &plus) - lppl(t, &minus)) / (2.0 * H)
                })
                .collect();
            assert_relative_eq!(&actual[..], &desired[..], epsilon = 1e-5, max_relative = 1e-5);
        }
    }

    #[test]
    fn lppl_derivatives_clamped() {
        let mut jac = [f64::NAN; NPARAMS];
        lppl_derivatives(PARAM[0] + 1.0, &PARAM, &mut jac);
        assert_eq!(jac, [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn params_from_slice() {
        let params = LpplParams::try_from(&PARAM[..]).unwrap();
        assert_eq!(params.to_array(), PARAM);
        assert_eq!(
            LpplParams::try_from(&PARAM[..6]),
            Err(LpplError::WrongParameterCount { actual: 6 })
        );
        assert_eq!(
            LpplParams::try_from(&[0.0; 8][..]),
            Err(LpplError::WrongParameterCount { actual: 8 })
        );
    }

    #[test]
    fn params_serde() {
        let params = LpplParams::from(PARAM);
        let json = serde_json::to_string(&params).unwrap();
        let back: LpplParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}

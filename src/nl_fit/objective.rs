use crate::nl_fit::finite_diff::central_difference;

/// Scalar function to be minimized
pub trait Objective<const NPARAMS: usize> {
    fn value(&self, x: &[f64; NPARAMS]) -> f64;

    /// Writes the gradient at `x` into `grad` and returns the value at `x`
    fn gradient(&self, x: &[f64; NPARAMS], grad: &mut [f64; NPARAMS]) -> f64 {
        central_difference(|x| self.value(x), x, grad)
    }
}

impl<F, const NPARAMS: usize> Objective<NPARAMS> for F
where
    F: Fn(&[f64; NPARAMS]) -> f64,
{
    #[inline]
    fn value(&self, x: &[f64; NPARAMS]) -> f64 {
        self(x)
    }
}

/// Objective wrapper counting evaluations
pub(super) struct CountedObjective<'a, O: ?Sized, const NPARAMS: usize> {
    objective: &'a O,
    pub evaluations: usize,
}

impl<'a, O, const NPARAMS: usize> CountedObjective<'a, O, NPARAMS>
where
    O: Objective<NPARAMS> + ?Sized,
{
    pub fn new(objective: &'a O) -> Self {
        Self {
            objective,
            evaluations: 0,
        }
    }

    pub fn value(&mut self, x: &[f64; NPARAMS]) -> f64 {
        self.evaluations += 1;
        self.objective.value(x)
    }

    /// Value with non-finite results replaced by positive infinity, so they compare as the worst
    pub fn value_or_inf(&mut self, x: &[f64; NPARAMS]) -> f64 {
        let value = self.value(x);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    }

    pub fn gradient(&mut self, x: &[f64; NPARAMS], grad: &mut [f64; NPARAMS]) -> f64 {
        self.evaluations += 1;
        self.objective.gradient(x, grad)
    }
}

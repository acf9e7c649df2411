//! Derivative-free minimisation with the Nelder–Mead simplex.
//!
//! Used to fit the seasonal model's conditional-sum-of-squares objective. Objective
//! values that are NaN are treated as `+∞`, so regions where the residual recursion
//! blows up are simply walked away from. A search that runs out of budget is restarted
//! from its best vertex with a fresh simplex, up to `restarts` times.

/// Simplex settings.
#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    /// Iteration budget.
    pub max_iterations: usize,
    /// Relative spread of simplex values at which the search stops.
    pub tolerance: f64,
    /// Offset of the initial simplex vertices along each axis.
    pub initial_step: f64,
    /// Fresh simplexes built around the best vertex after an unconverged search.
    pub restarts: usize,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-8,
            initial_step: 0.1,
            restarts: 2,
        }
    }
}

/// Best vertex found.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Argmin.
    pub point: Vec<f64>,
    /// Objective at `point`.
    pub value: f64,
    /// Iterations performed, summed over restarts.
    pub iterations: usize,
    /// Whether the tolerance was met within the budget.
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;
/// Absolute floor on the convergence test, for objectives whose minimum is ~0.
const TINY: f64 = 1e-20;

impl NelderMead {
    /// Minimise `f` starting from `start`.
    pub fn minimize<F>(&self, mut f: F, start: &[f64]) -> Minimum
    where
        F: FnMut(&[f64]) -> f64,
    {
        let mut eval = |x: &[f64]| {
            let v = f(x);
            if v.is_nan() { f64::INFINITY } else { v }
        };

        let mut best = self.descend(&mut eval, start);
        let mut iterations = best.iterations;
        for _ in 0..self.restarts {
            if best.converged {
                break;
            }
            // The restart keeps `best.point` as a vertex, so its value never gets worse.
            best = self.descend(&mut eval, &best.point);
            iterations += best.iterations;
        }
        best.iterations = iterations;
        best
    }

    fn descend<E>(&self, eval: &mut E, start: &[f64]) -> Minimum
    where
        E: FnMut(&[f64]) -> f64,
    {
        let n = start.len();
        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((start.to_vec(), eval(start)));
        if n == 0 {
            return finish(simplex, 0, true);
        }
        for i in 0..n {
            let mut x = start.to_vec();
            x[i] += self.initial_step;
            let v = eval(&x);
            simplex.push((x, v));
        }

        let mut iterations = 0;
        loop {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            let best = simplex[0].1;
            let worst = simplex[n].1;
            let spread = (worst - best).abs();
            if spread.is_finite() && 2.0 * spread <= self.tolerance * (best.abs() + worst.abs()) + TINY
            {
                return finish(simplex, iterations, true);
            }
            if iterations >= self.max_iterations {
                return finish(simplex, iterations, false);
            }
            iterations += 1;

            let centroid: Vec<f64> = (0..n)
                .map(|j| simplex[..n].iter().map(|(x, _)| x[j]).sum::<f64>() / n as f64)
                .collect();
            let along = |t: f64, from: &[f64]| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(from)
                    .map(|(c, w)| c + t * (c - w))
                    .collect()
            };

            let reflected = along(REFLECT, &simplex[n].0);
            let fr = eval(&reflected);
            if fr < simplex[0].1 {
                let expanded = along(EXPAND, &simplex[n].0);
                let fe = eval(&expanded);
                simplex[n] = if fe < fr { (expanded, fe) } else { (reflected, fr) };
                continue;
            }
            if fr < simplex[n - 1].1 {
                simplex[n] = (reflected, fr);
                continue;
            }

            let (contracted, fc) = if fr < simplex[n].1 {
                let x = along(CONTRACT, &simplex[n].0);
                let v = eval(&x);
                (x, v)
            } else {
                let x = along(-CONTRACT, &simplex[n].0);
                let v = eval(&x);
                (x, v)
            };
            if fc < fr.min(simplex[n].1) {
                simplex[n] = (contracted, fc);
                continue;
            }

            let anchor = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let x: Vec<f64> = anchor
                    .iter()
                    .zip(&vertex.0)
                    .map(|(a, v)| a + SHRINK * (v - a))
                    .collect();
                let v = eval(&x);
                *vertex = (x, v);
            }
        }
    }
}

fn finish(mut simplex: Vec<(Vec<f64>, f64)>, iterations: usize, converged: bool) -> Minimum {
    let (point, value) = simplex.swap_remove(0);
    Minimum {
        point,
        value,
        iterations,
        converged,
    }
}

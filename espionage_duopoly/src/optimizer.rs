//! Derivative-free maximization on a box.
//!
//! Objectives are fallible: an `Err` from the objective aborts the search and
//! is returned unchanged. Infeasible points that should not abort must be
//! mapped to a finite value by the caller.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Tolerances met.
    Converged,
    /// Iteration cap reached first; the incumbent best point is returned.
    IterationLimit,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Converged => "converged",
            Self::IterationLimit => "iteration_limit",
        };
        f.write_str(s)
    }
}

/// Result of a two-dimensional search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexResult {
    pub x: [f64; 2],
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

/// Nelder–Mead simplex with projection onto `[lower, upper]^2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMead {
    /// Relative tolerance on the objective spread across the simplex
    pub f_tol: f64,
    /// Absolute tolerance on the simplex radius
    pub x_tol: f64,
    pub max_iter: usize,
    /// Edge length of the starting simplex
    pub initial_step: f64,
}

#[derive(Debug, Clone, Copy)]
struct Vertex {
    x: [f64; 2],
    f: f64,
}

fn project(x: [f64; 2], lower: f64, upper: f64) -> [f64; 2] {
    [x[0].clamp(lower, upper), x[1].clamp(lower, upper)]
}

/// centroid + t * (centroid - worst)
fn along(centroid: [f64; 2], worst: [f64; 2], t: f64) -> [f64; 2] {
    [
        centroid[0] + t * (centroid[0] - worst[0]),
        centroid[1] + t * (centroid[1] - worst[1]),
    ]
}

impl NelderMead {
    pub fn maximize<E, F>(&self, mut objective: F, start: [f64; 2], lower: f64, upper: f64) -> Result<SimplexResult, E>
    where
        F: FnMut([f64; 2]) -> Result<f64, E>,
    {
        let mut evaluations = 0;
        let mut eval = |x: [f64; 2]| -> Result<Vertex, E> {
            let x = project(x, lower, upper);
            evaluations += 1;
            Ok(Vertex { x, f: objective(x)? })
        };

        let start = project(start, lower, upper);
        let origin = eval(start)?;
        let mut simplex = [origin; 3];
        for axis in 0..2 {
            let mut x = start;
            // Step inward when the start sits on the upper face.
            x[axis] = if start[axis] + self.initial_step <= upper {
                start[axis] + self.initial_step
            } else {
                start[axis] - self.initial_step
            };
            simplex[axis + 1] = eval(x)?;
        }

        let mut iterations = 0;
        let mut termination = Termination::IterationLimit;

        loop {
            // Descending: best first.
            simplex.sort_by(|a, b| b.f.total_cmp(&a.f));
            if self.has_converged(&simplex) {
                termination = Termination::Converged;
                break;
            }
            if iterations >= self.max_iter {
                break;
            }
            iterations += 1;

            let [best, second, worst] = simplex;
            let centroid = [(best.x[0] + second.x[0]) / 2.0, (best.x[1] + second.x[1]) / 2.0];

            let reflected = eval(along(centroid, worst.x, 1.0))?;
            if reflected.f > best.f {
                let expanded = eval(along(centroid, worst.x, 2.0))?;
                simplex[2] = if expanded.f > reflected.f { expanded } else { reflected };
                continue;
            }
            if reflected.f > second.f {
                simplex[2] = reflected;
                continue;
            }

            let contracted = if reflected.f > worst.f {
                let outside = eval(along(centroid, worst.x, 0.5))?;
                (outside.f >= reflected.f).then_some(outside)
            } else {
                let inside = eval(along(centroid, worst.x, -0.5))?;
                (inside.f > worst.f).then_some(inside)
            };
            if let Some(vertex) = contracted {
                simplex[2] = vertex;
                continue;
            }

            // Shrink toward the best vertex.
            for i in 1..3 {
                let x = simplex[i].x;
                let shrunk = [best.x[0] + 0.5 * (x[0] - best.x[0]), best.x[1] + 0.5 * (x[1] - best.x[1])];
                simplex[i] = eval(shrunk)?;
            }
        }

        let best = simplex[0];
        Ok(SimplexResult {
            x: best.x,
            value: best.f,
            iterations,
            evaluations,
            termination,
        })
    }

    /// Simplex sorted best-first.
    fn has_converged(&self, simplex: &[Vertex; 3]) -> bool {
        let best = simplex[0];
        let spread = best.f - simplex[2].f;
        let radius = simplex[1..]
            .iter()
            .map(|v| (v.x[0] - best.x[0]).abs().max((v.x[1] - best.x[1]).abs()))
            .fold(0.0, f64::max);
        spread <= self.f_tol * (1.0 + best.f.abs()) && radius <= self.x_tol
    }
}

/// Result of a one-dimensional search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchResult {
    pub x: f64,
    pub value: f64,
    pub evaluations: usize,
}

/// Golden-section maximization of a unimodal function on `[lower, upper]`.
///
/// The bracket is narrowed to `tol`; the midpoint is then compared against
/// both end points so that corner maxima are returned exactly.
pub fn golden_section_maximize<E, F>(mut objective: F, lower: f64, upper: f64, tol: f64) -> Result<LineSearchResult, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let (mut a, mut b) = (lower, upper);
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = objective(c)?;
    let mut fd = objective(d)?;
    let mut evaluations = 2;

    while b - a > tol {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = objective(c)?;
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = objective(d)?;
        }
        evaluations += 1;
    }

    let mid = 0.5 * (a + b);
    let mut best = LineSearchResult {
        x: mid,
        value: objective(mid)?,
        evaluations: 0,
    };
    for x in [lower, upper] {
        let value = objective(x)?;
        if value > best.value {
            best = LineSearchResult { x, value, evaluations: 0 };
        }
    }
    best.evaluations = evaluations + 3;
    Ok(best)
}

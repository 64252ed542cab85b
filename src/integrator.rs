//! Adaptive Runge–Kutta integration of the phase state.
//!
//! [`DormandPrince45`] is an explicit embedded 5(4) pair with first-same-as-last
//! stages, RMS error control against `atol + rtol·|y|`, and a 4th-order
//! continuous extension used to sample the solution at requested times.

use crate::dynamics::{position_of, velocity_of, OdeSystem, PhaseState};
use crate::error::{ClusterChainError, Result};
use nalgebra::{SMatrix, SVector, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Relative tolerance used by trajectory solves
pub const DEFAULT_RTOL: f64 = 1e-8;
/// Absolute tolerance used by trajectory solves
pub const DEFAULT_ATOL: f64 = 1e-10;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
// 1 / (error estimator order + 1)
const ERROR_EXPONENT: f64 = -1.0 / 5.0;
const STAGES: usize = 6;

const C: [f64; STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];

const A: [[f64; 5]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
];

const B: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

// difference between the 5th and 4th order weights, last entry on the FSAL stage
const E: [f64; 7] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];

// continuous extension, row per stage, column per power of the step fraction
const P: [[f64; 4]; 7] = [
    [
        1.0,
        -8048581381.0 / 2820520608.0,
        8663915743.0 / 2820520608.0,
        -12715105075.0 / 11282082432.0,
    ],
    [0.0, 0.0, 0.0, 0.0],
    [
        0.0,
        131558114200.0 / 32700410799.0,
        -68118460800.0 / 10900136933.0,
        87487479700.0 / 32700410799.0,
    ],
    [
        0.0,
        -1754552775.0 / 470086768.0,
        14199869525.0 / 1410260304.0,
        -10690763975.0 / 1880347072.0,
    ],
    [
        0.0,
        127303824393.0 / 49829197408.0,
        -318862633887.0 / 49829197408.0,
        701980252875.0 / 199316789632.0,
    ],
    [
        0.0,
        -282668133.0 / 205662961.0,
        2019193451.0 / 616988883.0,
        -1453857185.0 / 822651844.0,
    ],
    [
        0.0,
        40617522.0 / 29380423.0,
        -110615467.0 / 29380423.0,
        69997945.0 / 29380423.0,
    ],
];

type StageMatrix = SMatrix<f64, 6, 7>;
type Interpolant = SMatrix<f64, 6, 4>;

/// Error tolerances for adaptive step control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: DEFAULT_RTOL,
            atol: DEFAULT_ATOL,
        }
    }
}

/// Integrator settings
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorConfig {
    pub tolerances: Tolerances,
    /// Initial step size; chosen automatically when `None`
    pub first_step: Option<f64>,
    /// Upper bound on the step size
    pub max_step: f64,
    /// Give up after this many attempted steps
    pub max_steps: Option<u64>,
    /// Keep the piecewise interpolant for evaluation after the solve
    pub dense_output: bool,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            first_step: None,
            max_step: f64::INFINITY,
            max_steps: None,
            dense_output: false,
        }
    }
}

impl IntegratorConfig {
    pub fn with_tolerances(tolerances: Tolerances) -> Self {
        Self {
            tolerances,
            ..Self::default()
        }
    }

    pub fn dense(mut self) -> Self {
        self.dense_output = true;
        self
    }
}

/// Final state of an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// Reached the end of the time span
    Succeeded,
    /// Stopped early; see `Trajectory::message`
    Failed,
}

/// One accepted step's interpolant
#[derive(Debug, Clone)]
struct DenseSegment {
    t_old: f64,
    t: f64,
    h: f64,
    y_old: PhaseState,
    q: Interpolant,
}

impl DenseSegment {
    fn eval(&self, t: f64) -> PhaseState {
        let x = (t - self.t_old) / self.h;
        let p = Vector4::new(x, x * x, x * x * x, x * x * x * x);
        self.y_old + self.h * (self.q * p)
    }

    fn contains(&self, t: f64) -> bool {
        let (lo, hi) = if self.t_old <= self.t {
            (self.t_old, self.t)
        } else {
            (self.t, self.t_old)
        };
        lo <= t && t <= hi
    }
}

/// Continuous solution over the integrated span
#[derive(Debug, Clone, Default)]
pub struct DenseSolution {
    segments: Vec<DenseSegment>,
}

impl DenseSolution {
    /// Evaluates the solution at `t`, or `None` outside the integrated span
    pub fn eval(&self, t: f64) -> Option<PhaseState> {
        let first = self.segments.first()?;
        let forward = first.t >= first.t_old;
        // segments are ordered along the integration direction
        let idx = self.segments.partition_point(|s| {
            if forward {
                s.t < t
            } else {
                s.t > t
            }
        });
        let segment = self.segments.get(idx)?;
        segment.contains(t).then(|| segment.eval(t))
    }

    /// Covered time interval as `(start, end)` in integration order
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((self.segments.first()?.t_old, self.segments.last()?.t))
    }
}

/// Sampled solution of an initial value problem
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// Sample times
    pub t: Vec<f64>,
    /// Phase state at each sample time
    pub y: Vec<PhaseState>,
    pub status: SolverStatus,
    pub message: String,
    /// Right-hand side evaluations
    pub nfev: usize,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub dense: Option<DenseSolution>,
}

impl Trajectory {
    pub fn success(&self) -> bool {
        self.status == SolverStatus::Succeeded
    }

    /// Converts a failed integration into an error
    pub fn ensure_success(self) -> Result<Self> {
        match self.status {
            SolverStatus::Succeeded => Ok(self),
            SolverStatus::Failed => Err(ClusterChainError::SolverFailure {
                message: self.message,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.y.iter().map(position_of).collect()
    }

    pub fn velocities(&self) -> Vec<Vector3<f64>> {
        self.y.iter().map(velocity_of).collect()
    }

    /// Last sampled state
    pub fn final_state(&self) -> Option<(f64, PhaseState)> {
        Some((*self.t.last()?, *self.y.last()?))
    }

    /// Evaluates the dense solution, when it was kept
    pub fn sol(&self, t: f64) -> Option<PhaseState> {
        self.dense.as_ref()?.eval(t)
    }
}

/// An initial value problem solver for the phase state
pub trait Integrator {
    /// Integrates `system` from `t_span.0` to `t_span.1`.
    ///
    /// With `t_eval` the trajectory is sampled at exactly those times (which
    /// must lie in the span, ordered along the integration direction);
    /// otherwise every accepted step is returned. Invalid input is an
    /// error; an integration that cannot finish returns a trajectory with
    /// [`SolverStatus::Failed`].
    fn solve(
        &self,
        system: &dyn OdeSystem,
        t_span: (f64, f64),
        y0: PhaseState,
        t_eval: Option<&[f64]>,
    ) -> Result<Trajectory>;

    fn name(&self) -> String;
}

#[inline(always)]
fn rms_norm(v: &PhaseState) -> f64 {
    v.norm() / (v.len() as f64).sqrt()
}

/// Explicit Dormand–Prince 5(4) integrator
#[derive(Debug, Clone, Default)]
pub struct DormandPrince45 {
    pub config: IntegratorConfig,
}

struct StepOutcome {
    y_new: PhaseState,
    f_new: PhaseState,
    k: [PhaseState; 7],
}

impl DormandPrince45 {
    pub fn new(config: IntegratorConfig) -> Self {
        Self { config }
    }

    fn validate(&self, t_span: (f64, f64), y0: &PhaseState, t_eval: Option<&[f64]>) -> Result<()> {
        let (t0, t1) = t_span;
        if !t0.is_finite() || !t1.is_finite() {
            return Err(ClusterChainError::invalid(format!(
                "time span ({t0}, {t1}) must be finite"
            )));
        }
        if let Some(i) = y0.iter().position(|v| !v.is_finite()) {
            return Err(ClusterChainError::invalid(format!(
                "initial state component {i} is not finite"
            )));
        }
        let Tolerances { rtol, atol } = self.config.tolerances;
        if !(rtol.is_finite() && rtol >= 0.0) || !(atol.is_finite() && atol >= 0.0) {
            return Err(ClusterChainError::invalid(format!(
                "tolerances must be non-negative and finite (rtol = {rtol}, atol = {atol})"
            )));
        }
        if !(self.config.max_step > 0.0) {
            return Err(ClusterChainError::invalid("max_step must be positive"));
        }
        if let Some(h) = self.config.first_step {
            if !(h.is_finite() && h > 0.0) {
                return Err(ClusterChainError::invalid("first_step must be positive"));
            }
        }
        if let Some(times) = t_eval {
            let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
            if let Some(t) = times.iter().find(|t| !(lo <= **t && **t <= hi)) {
                return Err(ClusterChainError::invalid(format!(
                    "evaluation time {t} lies outside the span ({t0}, {t1})"
                )));
            }
            let direction = if t1 >= t0 { 1.0 } else { -1.0 };
            if times.windows(2).any(|w| direction * (w[1] - w[0]) < 0.0) {
                return Err(ClusterChainError::invalid(
                    "evaluation times must be sorted along the integration direction",
                ));
            }
        }
        Ok(())
    }

    fn initial_step(
        &self,
        system: &dyn OdeSystem,
        t0: f64,
        y0: &PhaseState,
        f0: &PhaseState,
        direction: f64,
        interval: f64,
        tol: &Tolerances,
    ) -> f64 {
        let scale = y0.map(|v| tol.atol + v.abs() * tol.rtol);
        let d0 = rms_norm(&y0.component_div(&scale));
        let d1 = rms_norm(&f0.component_div(&scale));
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        }
        .min(interval);

        let y1 = y0 + h0 * direction * f0;
        let f1 = system.rhs(t0 + h0 * direction, &y1);
        let d2 = rms_norm(&(f1 - f0).component_div(&scale)) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(-ERROR_EXPONENT)
        };
        (100.0 * h0).min(h1).min(interval)
    }

    fn rk_step(
        system: &dyn OdeSystem,
        t: f64,
        y: &PhaseState,
        f: &PhaseState,
        h: f64,
    ) -> StepOutcome {
        let mut k = [PhaseState::zeros(); 7];
        k[0] = *f;
        for s in 1..STAGES {
            let dy = (0..s).fold(PhaseState::zeros(), |acc, j| acc + A[s][j] * k[j]) * h;
            k[s] = system.rhs(t + C[s] * h, &(y + dy));
        }
        let y_new = y + h * k
            .iter()
            .zip(B.iter())
            .fold(PhaseState::zeros(), |acc, (k_j, b_j)| acc + *b_j * k_j);
        let f_new = system.rhs(t + h, &y_new);
        k[STAGES] = f_new;
        StepOutcome { y_new, f_new, k }
    }

    fn interpolant(k: &[PhaseState; 7]) -> Interpolant {
        let stages = StageMatrix::from_columns(k);
        let p = SMatrix::<f64, 7, 4>::from_fn(|i, j| P[i][j]);
        stages * p
    }
}

impl Integrator for DormandPrince45 {
    fn name(&self) -> String {
        "RK45".to_string()
    }

    fn solve(
        &self,
        system: &dyn OdeSystem,
        t_span: (f64, f64),
        y0: PhaseState,
        t_eval: Option<&[f64]>,
    ) -> Result<Trajectory> {
        self.validate(t_span, &y0, t_eval)?;
        let (t0, t1) = t_span;
        let mut tol = self.config.tolerances;
        let rtol_floor = 100.0 * f64::EPSILON;
        if tol.rtol < rtol_floor {
            log::warn!("rtol {} is too small, using {}", tol.rtol, rtol_floor);
            tol.rtol = rtol_floor;
        }

        let mut trajectory = Trajectory {
            t: Vec::new(),
            y: Vec::new(),
            status: SolverStatus::Succeeded,
            message: "The solver successfully reached the end of the integration interval."
                .to_string(),
            nfev: 0,
            accepted_steps: 0,
            rejected_steps: 0,
            dense: self.config.dense_output.then(DenseSolution::default),
        };

        if t0 == t1 {
            match t_eval {
                Some(times) => {
                    trajectory.t = times.to_vec();
                    trajectory.y = vec![y0; times.len()];
                }
                None => {
                    trajectory.t.push(t0);
                    trajectory.y.push(y0);
                }
            }
            return Ok(trajectory);
        }

        let direction = (t1 - t0).signum();
        let interval = (t1 - t0).abs();
        let e = SVector::<f64, 7>::from_column_slice(&E);

        let mut t = t0;
        let mut y = y0;
        let mut f = system.rhs(t, &y);
        trajectory.nfev += 1;

        let mut h_abs = match self.config.first_step {
            Some(h) => h.min(interval),
            None => {
                trajectory.nfev += 1;
                self.initial_step(system, t, &y, &f, direction, interval, &tol)
            }
        };

        if t_eval.is_none() {
            trajectory.t.push(t0);
            trajectory.y.push(y0);
        }
        let mut eval_idx = 0;
        let mut steps: u64 = 0;

        while direction * (t - t1) < 0.0 {
            let toward = if direction > 0.0 { t.next_up() } else { t.next_down() };
            let min_step = 10.0 * (toward - t).abs();
            h_abs = h_abs.clamp(min_step, self.config.max_step.max(min_step));

            let mut step_rejected = false;
            let (t_new, outcome, h) = loop {
                if h_abs < min_step {
                    trajectory.status = SolverStatus::Failed;
                    trajectory.message =
                        "Required step size is less than spacing between numbers.".to_string();
                    break (t, None, 0.0);
                }
                steps += 1;
                if let Some(max_steps) = self.config.max_steps {
                    if steps > max_steps {
                        trajectory.status = SolverStatus::Failed;
                        trajectory.message =
                            format!("Maximum number of steps ({max_steps}) exceeded.");
                        break (t, None, 0.0);
                    }
                }

                let mut t_new = t + h_abs * direction;
                if direction * (t_new - t1) > 0.0 {
                    t_new = t1;
                }
                let h = t_new - t;
                h_abs = h.abs();

                let outcome = Self::rk_step(system, t, &y, &f, h);
                trajectory.nfev += STAGES;

                let scale = y.zip_map(&outcome.y_new, |a, b| {
                    tol.atol + a.abs().max(b.abs()) * tol.rtol
                });
                let error = (StageMatrix::from_columns(&outcome.k) * e * h).component_div(&scale);
                let error_norm = rms_norm(&error);

                if error_norm < 1.0 {
                    let mut factor = if error_norm == 0.0 {
                        MAX_FACTOR
                    } else {
                        (SAFETY * error_norm.powf(ERROR_EXPONENT)).min(MAX_FACTOR)
                    };
                    if step_rejected {
                        factor = factor.min(1.0);
                    }
                    h_abs *= factor;
                    break (t_new, Some(outcome), h);
                }

                // NaN error norms land here as well and shrink the step
                h_abs *= (SAFETY * error_norm.powf(ERROR_EXPONENT)).max(MIN_FACTOR);
                step_rejected = true;
                trajectory.rejected_steps += 1;
            };

            let Some(outcome) = outcome else {
                break;
            };
            if let Some(i) = outcome.y_new.iter().position(|v| !v.is_finite()) {
                trajectory.status = SolverStatus::Failed;
                trajectory.message =
                    format!("Non-finite state component {i} at t = {t_new}.");
                break;
            }
            trajectory.accepted_steps += 1;

            let needs_interpolant = t_eval.is_some() || trajectory.dense.is_some();
            if needs_interpolant {
                let segment = DenseSegment {
                    t_old: t,
                    t: t_new,
                    h,
                    y_old: y,
                    q: Self::interpolant(&outcome.k),
                };
                if let Some(times) = t_eval {
                    while eval_idx < times.len() && direction * (times[eval_idx] - t_new) <= 0.0 {
                        trajectory.t.push(times[eval_idx]);
                        trajectory.y.push(segment.eval(times[eval_idx]));
                        eval_idx += 1;
                    }
                }
                if let Some(dense) = trajectory.dense.as_mut() {
                    dense.segments.push(segment);
                }
            }

            t = t_new;
            y = outcome.y_new;
            f = outcome.f_new;

            if t_eval.is_none() {
                trajectory.t.push(t);
                trajectory.y.push(y);
            }
        }

        Ok(trajectory)
    }
}

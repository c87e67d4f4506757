//! # Tensor Algebra Engine
//!
//! [`Spacetime`] derives the curvature tensors of a [`ParsedMetric`]. Each
//! quantity is computed at most once per spacetime and cached, so an
//! evaluation that needs the Einstein tensor and the Kretschmann scalar
//! inverts the metric and builds the Riemann tensor exactly once.
//!
//! ## Conventions
//!
//! - `Γ^a_{bc} = ½ g^{ad} (∂_b g_{dc} + ∂_c g_{bd} − ∂_d g_{bc})`
//! - `R^a_{bcd} = ∂_c Γ^a_{bd} − ∂_d Γ^a_{bc} + Γ^a_{ce} Γ^e_{bd} − Γ^a_{de} Γ^e_{bc}`
//! - `R_{bd} = R^a_{bad}`, `R = g^{bd} R_{bd}`, `G_{ab} = R_{ab} − ½ g_{ab} R`
//! - `R_{abcd} = g_{ae} R^e_{bcd}`, `K = R_{abcd} R^{abcd}`
//!
//! Flat index layout: `dg[a, b, c] = ∂_c g_{ab}`, `Γ[a, b, c] = Γ^a_{bc}`,
//! `R[a, b, c, d] = R^a_{bcd}`.

use std::sync::OnceLock;
use std::time::Instant;

use grtk_cas::{CasError, RatFunc, SymMatrix};
use grtk_core::MetricSpec;

use crate::error::TensorError;
use crate::metric::{parse_metric, ParsedMetric};
use crate::tensor::Tensor;

type Cached<T> = OnceLock<Result<T, TensorError>>;

/// A metric together with its lazily computed curvature.
#[derive(Debug)]
pub struct Spacetime {
    metric: ParsedMetric,
    inverse: Cached<SymMatrix>,
    metric_derivatives: Cached<Tensor>,
    christoffel: Cached<Tensor>,
    riemann: Cached<Tensor>,
    ricci: Cached<Tensor>,
    ricci_scalar: Cached<RatFunc>,
    einstein: Cached<Tensor>,
    mixed_einstein: Cached<Tensor>,
    riemann_lowered: Cached<Tensor>,
    kretschmann: Cached<RatFunc>,
}

fn cached<'a, T>(
    cell: &'a Cached<T>,
    init: impl FnOnce() -> Result<T, TensorError>,
) -> Result<&'a T, TensorError> {
    cell.get_or_init(init).as_ref().map_err(Clone::clone)
}

/// `Σ a_i * b_i`, skipping zero factors.
fn contract<'a>(pairs: impl Iterator<Item = (&'a RatFunc, &'a RatFunc)>) -> RatFunc {
    let mut sum = RatFunc::zero();
    for (a, b) in pairs {
        if a.is_zero() || b.is_zero() {
            continue;
        }
        sum = &sum + &(a * b);
    }
    sum
}

fn logged<T>(quantity: &'static str, dimension: usize, compute: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let value = compute();
    tracing::debug!(
        quantity,
        dimension,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "computed curvature quantity"
    );
    value
}

impl Spacetime {
    pub fn new(metric: ParsedMetric) -> Self {
        Self {
            metric,
            inverse: OnceLock::new(),
            metric_derivatives: OnceLock::new(),
            christoffel: OnceLock::new(),
            riemann: OnceLock::new(),
            ricci: OnceLock::new(),
            ricci_scalar: OnceLock::new(),
            einstein: OnceLock::new(),
            mixed_einstein: OnceLock::new(),
            riemann_lowered: OnceLock::new(),
            kretschmann: OnceLock::new(),
        }
    }

    /// Parse `spec` and wrap the result.
    pub fn from_spec(spec: &MetricSpec) -> Result<Self, TensorError> {
        Ok(Self::new(parse_metric(spec)?))
    }

    pub fn metric(&self) -> &ParsedMetric {
        &self.metric
    }

    pub fn dimension(&self) -> usize {
        self.metric.dimension()
    }

    fn g(&self, a: usize, b: usize) -> &RatFunc {
        self.metric.g_dd.get(a, b)
    }

    /// `g^{ab}`.
    pub fn inverse(&self) -> Result<&SymMatrix, TensorError> {
        cached(&self.inverse, || {
            logged("inverse", self.dimension(), || {
                self.metric.g_dd.inverse().map_err(|error| match error {
                    CasError::SingularMatrix | CasError::DivisionByZero => {
                        TensorError::SingularMetric
                    }
                    other => TensorError::Symbolic(other),
                })
            })
        })
    }

    /// `∂_c g_{ab}` at `[a, b, c]`.
    pub fn metric_derivatives(&self) -> Result<&Tensor, TensorError> {
        cached(&self.metric_derivatives, || {
            let n = self.dimension();
            logged("metric_derivatives", n, || {
                Ok(Tensor::try_from_fn(n, 3, |ix| {
                    self.g(ix[0], ix[1]).diff(self.metric.coord(ix[2]))
                })?)
            })
        })
    }

    /// `Γ^a_{bc}` at `[a, b, c]`.
    pub fn christoffel(&self) -> Result<&Tensor, TensorError> {
        cached(&self.christoffel, || {
            let n = self.dimension();
            let inverse = self.inverse()?;
            let dg = self.metric_derivatives()?;
            logged("christoffel", n, || {
                Ok(Tensor::try_from_fn(n, 3, |ix| {
                    let (a, b, c) = (ix[0], ix[1], ix[2]);
                    let mut sum = RatFunc::zero();
                    for d in 0..n {
                        let g_inv = inverse.get(a, d);
                        if g_inv.is_zero() {
                            continue;
                        }
                        let bracket = &(dg.get(&[d, c, b]) + dg.get(&[b, d, c])) - dg.get(&[b, c, d]);
                        if bracket.is_zero() {
                            continue;
                        }
                        sum = &sum + &(g_inv * &bracket);
                    }
                    sum.checked_div(&RatFunc::integer(2))
                })?)
            })
        })
    }

    /// `R^a_{bcd}` at `[a, b, c, d]`.
    pub fn riemann(&self) -> Result<&Tensor, TensorError> {
        cached(&self.riemann, || {
            let n = self.dimension();
            let gamma = self.christoffel()?;
            logged("riemann", n, || {
                Ok(Tensor::try_from_fn(n, 4, |ix| {
                    let (a, b, c, d) = (ix[0], ix[1], ix[2], ix[3]);
                    if c == d {
                        return Ok(RatFunc::zero());
                    }
                    let mut value = &gamma.get(&[a, b, d]).diff(self.metric.coord(c))?
                        - &gamma.get(&[a, b, c]).diff(self.metric.coord(d))?;
                    let plus = contract((0..n).map(|e| (gamma.get(&[a, c, e]), gamma.get(&[e, b, d]))));
                    let minus = contract((0..n).map(|e| (gamma.get(&[a, d, e]), gamma.get(&[e, b, c]))));
                    value = &(&value + &plus) - &minus;
                    Ok(value)
                })?)
            })
        })
    }

    /// `R_{bd}` at `[b, d]`.
    pub fn ricci(&self) -> Result<&Tensor, TensorError> {
        cached(&self.ricci, || {
            let n = self.dimension();
            let riemann = self.riemann()?;
            logged("ricci", n, || {
                Ok(Tensor::try_from_fn(n, 2, |ix| {
                    let mut sum = RatFunc::zero();
                    for a in 0..n {
                        sum = &sum + riemann.get(&[a, ix[0], a, ix[1]]);
                    }
                    Ok(sum)
                })?)
            })
        })
    }

    /// `R = g^{bd} R_{bd}`.
    pub fn ricci_scalar(&self) -> Result<&RatFunc, TensorError> {
        cached(&self.ricci_scalar, || {
            let n = self.dimension();
            let inverse = self.inverse()?;
            let ricci = self.ricci()?;
            Ok(logged("ricci_scalar", n, || {
                contract(
                    (0..n)
                        .flat_map(|b| (0..n).map(move |d| (b, d)))
                        .map(|(b, d)| (inverse.get(b, d), ricci.get(&[b, d]))),
                )
            }))
        })
    }

    /// `G_{ab}` at `[a, b]`.
    pub fn einstein(&self) -> Result<&Tensor, TensorError> {
        cached(&self.einstein, || {
            let n = self.dimension();
            let ricci = self.ricci()?;
            let half_scalar = self.ricci_scalar()?.checked_div(&RatFunc::integer(2))?;
            logged("einstein", n, || {
                Ok(Tensor::try_from_fn(n, 2, |ix| {
                    let trace_term = self.g(ix[0], ix[1]) * &half_scalar;
                    Ok(ricci.get(ix) - &trace_term)
                })?)
            })
        })
    }

    /// `G^a_b = g^{ac} G_{cb}` at `[a, b]`.
    pub fn mixed_einstein(&self) -> Result<&Tensor, TensorError> {
        cached(&self.mixed_einstein, || {
            let n = self.dimension();
            let inverse = self.inverse()?;
            let einstein = self.einstein()?;
            Ok(Tensor::try_from_fn(n, 2, |ix| {
                Ok(contract(
                    (0..n).map(|c| (inverse.get(ix[0], c), einstein.get(&[c, ix[1]]))),
                ))
            })?)
        })
    }

    /// `R_{abcd} = g_{ae} R^e_{bcd}` at `[a, b, c, d]`.
    pub fn riemann_lowered(&self) -> Result<&Tensor, TensorError> {
        cached(&self.riemann_lowered, || {
            let n = self.dimension();
            let riemann = self.riemann()?;
            logged("riemann_lowered", n, || {
                Ok(Tensor::try_from_fn(n, 4, |ix| {
                    Ok(contract((0..n).map(|e| {
                        (self.g(ix[0], e), riemann.get(&[e, ix[1], ix[2], ix[3]]))
                    })))
                })?)
            })
        })
    }

    /// `K = R_{abcd} R^{abcd}`, raising one index at a time from the
    /// cached lowered Riemann tensor and inverse metric.
    pub fn kretschmann(&self) -> Result<&RatFunc, TensorError> {
        cached(&self.kretschmann, || {
            let n = self.dimension();
            let inverse = self.inverse()?;
            let lowered = self.riemann_lowered()?;
            logged("kretschmann", n, || {
                let mut raised = lowered.clone();
                for slot in 0..4 {
                    raised = raise_slot(&raised, slot, inverse)?;
                }
                Ok(contract(lowered.components().iter().zip(raised.components())))
            })
        })
    }
}

/// Contract `g^{xy}` into index `slot` of `tensor`.
fn raise_slot(tensor: &Tensor, slot: usize, inverse: &SymMatrix) -> Result<Tensor, TensorError> {
    let n = tensor.dim();
    if tensor.is_zero() {
        return Ok(tensor.clone());
    }
    Ok(Tensor::try_from_fn(n, tensor.rank(), |ix| {
        let mut source = ix.to_vec();
        let mut sum = RatFunc::zero();
        for e in 0..n {
            let g_inv = inverse.get(ix[slot], e);
            if g_inv.is_zero() {
                continue;
            }
            source[slot] = e;
            let component = tensor.get(&source);
            if component.is_zero() {
                continue;
            }
            sum = &sum + &(g_inv * component);
        }
        Ok(sum)
    })?)
}

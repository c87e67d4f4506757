//! # Flat Tensors
//!
//! A rank-`k` tensor over `N` coordinates is stored as one flat vector of
//! `N**k` [`RatFunc`] components in row-major order. Index tuples map to
//! flat offsets with [`Tensor::offset`]; component construction runs in
//! parallel over flat offsets.

use grtk_cas::{CasError, RatFunc};
use grtk_core::{ArtifactMeta, TensorArtifact};
use rayon::prelude::*;
use serde_json::Value;

use crate::error::TensorError;

/// Dense symbolic tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    dim: usize,
    rank: usize,
    components: Vec<RatFunc>,
}

impl Tensor {
    /// All-zero tensor.
    pub fn zeros(dim: usize, rank: usize) -> Self {
        Self {
            dim,
            rank,
            components: vec![RatFunc::zero(); dim.pow(rank as u32)],
        }
    }

    /// Build every component from its index tuple, in parallel.
    pub fn try_from_fn<F>(dim: usize, rank: usize, f: F) -> Result<Self, CasError>
    where
        F: Fn(&[usize]) -> Result<RatFunc, CasError> + Sync,
    {
        let len = dim.pow(rank as u32);
        let components = (0..len)
            .into_par_iter()
            .map(|flat| f(&unflatten(flat, dim, rank)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            dim,
            rank,
            components,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Flat offset of an index tuple.
    pub fn offset(&self, index: &[usize]) -> usize {
        index.iter().fold(0, |acc, i| acc * self.dim + i)
    }

    pub fn get(&self, index: &[usize]) -> &RatFunc {
        &self.components[self.offset(index)]
    }

    pub fn components(&self) -> &[RatFunc] {
        &self.components
    }

    /// Index tuples paired with their components, in row-major order.
    pub fn iter_indexed(&self) -> impl Iterator<Item = (Vec<usize>, &RatFunc)> {
        self.components
            .iter()
            .enumerate()
            .map(|(flat, value)| (unflatten(flat, self.dim, self.rank), value))
    }

    pub fn is_zero(&self) -> bool {
        self.components.iter().all(RatFunc::is_zero)
    }

    /// Serialize as nested arrays of expression strings.
    pub fn to_artifact(&self, name: &str, indices: &str, meta: ArtifactMeta) -> TensorArtifact {
        TensorArtifact {
            name: name.to_string(),
            indices: indices.to_string(),
            components: self.nested(0, self.rank),
            meta,
        }
    }

    fn nested(&self, start: usize, depth: usize) -> Value {
        if depth == 0 {
            return Value::String(self.components[start].to_string());
        }
        let stride = self.dim.pow(depth as u32 - 1);
        Value::Array(
            (0..self.dim)
                .map(|i| self.nested(start + i * stride, depth - 1))
                .collect(),
        )
    }

    /// Parse an artifact back into a tensor. Every component must parse and
    /// the nesting must match `indices`.
    pub fn from_artifact(artifact: &TensorArtifact) -> Result<Self, TensorError> {
        let rank = artifact.rank();
        let dim = leading_length(&artifact.components, rank)?;
        let mut components = Vec::with_capacity(dim.pow(rank as u32));
        flatten_into(&artifact.components, rank, dim, &mut components)?;
        Ok(Self {
            dim,
            rank,
            components,
        })
    }
}

/// Index tuple of a flat offset.
pub fn unflatten(mut flat: usize, dim: usize, rank: usize) -> Vec<usize> {
    let mut index = vec![0; rank];
    for slot in index.iter_mut().rev() {
        *slot = flat % dim;
        flat /= dim;
    }
    index
}

fn leading_length(value: &Value, rank: usize) -> Result<usize, TensorError> {
    if rank == 0 {
        return Ok(1);
    }
    match value {
        Value::Array(items) if !items.is_empty() => Ok(items.len()),
        _ => Err(TensorError::InvalidArtifact(
            "components must be non-empty nested arrays".to_string(),
        )),
    }
}

fn flatten_into(
    value: &Value,
    depth: usize,
    dim: usize,
    out: &mut Vec<RatFunc>,
) -> Result<(), TensorError> {
    if depth == 0 {
        let component = match value {
            Value::String(text) => RatFunc::parse(text)?,
            Value::Number(number) => RatFunc::parse(&number.to_string())?,
            other => {
                return Err(TensorError::InvalidArtifact(format!(
                    "component {other} is not an expression"
                )))
            }
        };
        out.push(component);
        return Ok(());
    }
    match value {
        Value::Array(items) if items.len() == dim => {
            for item in items {
                flatten_into(item, depth - 1, dim, out)?;
            }
            Ok(())
        }
        _ => Err(TensorError::InvalidArtifact(format!(
            "expected an array of length {dim} at depth {depth}"
        ))),
    }
}

/// Apply `f` to every leaf of nested component arrays, keeping the nesting.
pub fn map_leaves(value: &Value, f: &dyn Fn(&Value) -> Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|item| map_leaves(item, f)).collect()),
        leaf => f(leaf),
    }
}

/// Apply a fallible `f` to every leaf of nested component arrays.
pub fn try_map_leaves<E>(
    value: &Value,
    f: &dyn Fn(&Value) -> Result<Value, E>,
) -> Result<Value, E> {
    match value {
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| try_map_leaves(item, f))
                .collect::<Result<Vec<_>, E>>()?,
        )),
        leaf => f(leaf),
    }
}

/// Every leaf of nested component arrays, depth first.
pub fn leaves(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(leaves).collect(),
        leaf => vec![leaf],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rf(text: &str) -> RatFunc {
        RatFunc::parse(text).unwrap()
    }

    #[test]
    fn offsets_are_row_major() {
        let tensor = Tensor::zeros(4, 3);
        assert_eq!(tensor.offset(&[0, 0, 1]), 1);
        assert_eq!(tensor.offset(&[1, 0, 0]), 16);
        assert_eq!(unflatten(16, 4, 3), vec![1, 0, 0]);
        assert_eq!(unflatten(27, 4, 3), vec![1, 2, 3]);
    }

    #[test]
    fn builds_components_from_indices() {
        let tensor = Tensor::try_from_fn(2, 2, |ix| {
            Ok(RatFunc::integer((10 * ix[0] + ix[1]) as i64))
        })
        .unwrap();
        assert_eq!(tensor.get(&[1, 0]), &RatFunc::integer(10));
        assert_eq!(tensor.components().len(), 4);
    }

    #[test]
    fn artifact_nesting_matches_rank() {
        let tensor = Tensor::try_from_fn(2, 2, |ix| {
            Ok(if ix[0] == ix[1] { rf("r**2") } else { RatFunc::zero() })
        })
        .unwrap();
        let artifact = tensor.to_artifact("g", "dd", ArtifactMeta::default());
        assert_eq!(artifact.components, json!([["r**2", "0"], ["0", "r**2"]]));
        assert_eq!(Tensor::from_artifact(&artifact).unwrap(), tensor);
    }

    #[test]
    fn from_artifact_rejects_ragged_components() {
        let artifact = TensorArtifact {
            name: "bad".into(),
            indices: "dd".into(),
            components: json!([["1", "0"], ["0"]]),
            meta: ArtifactMeta::default(),
        };
        assert!(matches!(
            Tensor::from_artifact(&artifact),
            Err(TensorError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn leaf_helpers_preserve_nesting() {
        let value = json!([["a", "b"], ["c", "d"]]);
        let upper = map_leaves(&value, &|leaf: &Value| json!(leaf.as_str().unwrap_or("").to_uppercase()));
        assert_eq!(upper, json!([["A", "B"], ["C", "D"]]));
        assert_eq!(leaves(&value).len(), 4);
    }
}

//! # Tensor-wide Simplify and Substitute
//!
//! Component-wise operations over [`TensorArtifact`]s and single
//! expressions. Simplification never fails: a component that cannot be
//! parsed is carried through verbatim. Substitution is strict: every
//! component and every replacement must parse.

use std::collections::BTreeMap;

use grtk_cas::{simplify_expr, RatFunc};
use grtk_core::TensorArtifact;
use serde_json::Value;

use crate::error::TensorError;
use crate::tensor::{map_leaves, try_map_leaves};

/// Simplify one expression at `level`. Unparsable text is returned as is.
pub fn simplify_expression(text: &str, level: u8) -> String {
    simplify_expr(text, level)
}

/// Simplify every component of `artifact` at `level`.
///
/// The result is named `<name>.simplified` and keeps indices and meta.
pub fn simplify_tensor(artifact: &TensorArtifact, level: u8) -> TensorArtifact {
    let components = map_leaves(&artifact.components, &|leaf: &Value| match leaf {
        Value::String(text) => Value::String(simplify_expr(text, level)),
        Value::Number(number) => Value::String(simplify_expr(&number.to_string(), level)),
        other => other.clone(),
    });
    TensorArtifact {
        name: format!("{}.simplified", artifact.name),
        indices: artifact.indices.clone(),
        components,
        meta: artifact.meta.clone(),
    }
}

/// Parse substitution values (numbers or expression strings).
pub fn parse_substitutions(
    substitutions: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, RatFunc>, TensorError> {
    substitutions
        .iter()
        .map(|(name, value)| Ok((name.clone(), parse_leaf(value)?)))
        .collect()
}

fn parse_leaf(value: &Value) -> Result<RatFunc, TensorError> {
    match value {
        Value::String(text) => Ok(RatFunc::parse(text)?),
        Value::Number(number) => Ok(RatFunc::parse(&number.to_string())?),
        other => Err(TensorError::InvalidArtifact(format!(
            "{other} is not an expression"
        ))),
    }
}

/// Substitute into one expression. Keys absent from `text` are unused.
pub fn substitute_expression(
    text: &str,
    substitutions: &BTreeMap<String, Value>,
) -> Result<String, TensorError> {
    let values = parse_substitutions(substitutions)?;
    Ok(RatFunc::parse(text)?.substitute(&values)?.to_string())
}

/// Substitute into every component of `artifact`.
///
/// The result is named `<name>.substituted` and keeps indices and meta.
pub fn substitute_tensor(
    artifact: &TensorArtifact,
    substitutions: &BTreeMap<String, Value>,
) -> Result<TensorArtifact, TensorError> {
    let values = parse_substitutions(substitutions)?;
    let components = try_map_leaves(&artifact.components, &|leaf: &Value| {
        let substituted = parse_leaf(leaf)?.substitute(&values)?;
        Ok::<_, TensorError>(Value::String(substituted.to_string()))
    })?;
    Ok(TensorArtifact {
        name: format!("{}.substituted", artifact.name),
        indices: artifact.indices.clone(),
        components,
        meta: artifact.meta.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use grtk_core::ArtifactMeta;
    use serde_json::json;

    fn artifact(components: Value) -> TensorArtifact {
        TensorArtifact {
            name: "ricci".into(),
            indices: "dd".into(),
            components,
            meta: ArtifactMeta::new(vec!["t".into(), "r".into()], "-+"),
        }
    }

    #[test]
    fn simplify_tensor_renames_and_keeps_shape() {
        let input = artifact(json!([["sin(x)**2 + cos(x)**2", 0], ["x*x - x**2", "(r**2 - 1)/(r - 1)"]]));
        let out = simplify_tensor(&input, 1);
        assert_eq!(out.name, "ricci.simplified");
        assert_eq!(out.indices, "dd");
        assert_eq!(out.meta, input.meta);
        assert_eq!(out.components, json!([["1", "0"], ["0", "r + 1"]]));
    }

    #[test]
    fn simplify_tensor_keeps_unparsable_components() {
        let input = artifact(json!([["1 +", "x"], ["0", "0"]]));
        let out = simplify_tensor(&input, 2);
        assert_eq!(out.components[0][0], json!("1 +"));
    }

    #[test]
    fn substitute_expression_ignores_unknown_keys() {
        let subs: BTreeMap<String, Value> =
            [("M".to_string(), json!(1)), ("q".to_string(), json!("7"))].into_iter().collect();
        assert_eq!(substitute_expression("2*M/r", &subs).unwrap(), "2/r");
    }

    #[test]
    fn substitute_expression_accepts_expressions() {
        let subs: BTreeMap<String, Value> = [("x".to_string(), json!("y + 1"))].into_iter().collect();
        let out = substitute_expression("x**2 - y**2", &subs).unwrap();
        assert_eq!(out, simplify_expression("2*y + 1", 1));
    }

    #[test]
    fn substitute_tensor_renames() {
        let input = artifact(json!([["M*r", "0"], ["0", "r"]]));
        let subs: BTreeMap<String, Value> = [("r".to_string(), json!(2))].into_iter().collect();
        let out = substitute_tensor(&input, &subs).unwrap();
        assert_eq!(out.name, "ricci.substituted");
        assert_eq!(out.components, json!([["2*M", "0"], ["0", "2"]]));
    }

    #[test]
    fn substitute_rejects_bad_values() {
        let subs: BTreeMap<String, Value> = [("r".to_string(), json!([1]))].into_iter().collect();
        assert!(substitute_expression("r", &subs).is_err());
        let bad: BTreeMap<String, Value> = [("r".to_string(), json!("0"))].into_iter().collect();
        assert!(substitute_expression("1/r", &bad).is_err());
    }
}

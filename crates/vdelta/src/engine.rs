use tracing::debug;
use vdelta_diff::{calculator_for, diff_delta, DiffOptions, DiffReport, Patch};
use vdelta_types::{Kind, Value};

use crate::error::Result;

/// A diff/apply handle bound to one set of [`DiffOptions`].
///
/// Holds no state beyond the options, so one engine may be shared freely
/// across threads.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    options: DiffOptions,
}

impl Engine {
    /// An engine with default options (cycle-fix on, positional sequences).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DiffOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    // ---- Patches ----

    pub fn diff(&self, old: &Value, new: &Value) -> Result<Patch> {
        Ok(vdelta_diff::diff(old, new, &self.options)?)
    }

    pub fn apply(&self, base: &Value, patch: &Patch) -> Result<Value> {
        Ok(vdelta_patch::apply(base, patch)?)
    }

    /// Diff `old` against `new`, apply the result to `old`, and check the
    /// outcome matches `new` under this engine's comparison.
    pub fn verify_roundtrip(&self, old: &Value, new: &Value) -> Result<bool> {
        let patch = self.diff(old, new)?;
        let rebuilt = self.apply(old, &patch)?;
        let residue = self.diff(&rebuilt, new)?;
        debug!(
            changes = patch.len(),
            residue = residue.len(),
            "roundtrip verified"
        );
        Ok(residue.is_empty())
    }

    // ---- Deltas ----

    /// Summarize with the calculator picked from the roots' kinds.
    pub fn delta(&self, old: &Value, new: &Value) -> Result<DiffReport> {
        Ok(diff_delta(old, new, &self.options)?)
    }

    /// Summarize with the calculator for `kind`, whatever the roots are.
    pub fn delta_as(&self, kind: Kind, old: &Value, new: &Value) -> Result<DiffReport> {
        Ok(calculator_for(kind).calculate(old, new, &self.options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from_json(&json)
    }

    #[test]
    fn engine_carries_its_options() {
        let engine = Engine::with_options(DiffOptions::default().with_order_insensitive());
        assert!(engine.options().order_insensitive);
        let patch = engine.diff(&v(json!([1, 2, 3])), &v(json!([3, 1, 2]))).unwrap();
        assert!(patch.is_empty());

        let strict = Engine::new();
        assert_eq!(
            strict.diff(&v(json!([1, 2, 3])), &v(json!([3, 1, 2]))).unwrap().len(),
            3
        );
    }

    #[test]
    fn verify_roundtrip_holds_for_both_modes() {
        let old = v(json!({"a": [1, 2, 2], "b": {"c": "x"}}));
        let new = v(json!({"a": [2, 9], "b": {"d": null}}));
        assert!(Engine::new().verify_roundtrip(&old, &new).unwrap());

        let relaxed = Engine::with_options(DiffOptions::default().with_order_insensitive());
        let (old, new) = (v(json!([4, 1, 1, 7])), v(json!([1, 8, 4])));
        assert!(relaxed.verify_roundtrip(&old, &new).unwrap());
    }

    #[test]
    fn delta_as_forces_a_calculator() {
        let engine = Engine::new();
        let report = engine
            .delta_as(Kind::Record, &v(json!({"a": {"b": 1}})), &v(json!({"a": {"b": 2}})))
            .unwrap();
        assert!(report.delta.get("b").is_some());

        let auto = engine.delta(&v(json!([1])), &v(json!([1, 2]))).unwrap();
        assert!(auto.delta.get("__length__").is_some());
    }
}

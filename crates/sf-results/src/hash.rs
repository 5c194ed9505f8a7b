//! Content-based hashing for run IDs.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 over the network definition, the run parameters and the solver version.
///
/// Identical inputs give identical ids, so a finished run can be reused.
pub fn compute_run_id<T: Serialize>(
    definition: &T,
    run_type: &crate::types::RunType,
    solver_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    let definition_json = serde_json::to_string(definition).unwrap_or_default();
    hasher.update(definition_json.as_bytes());

    let run_type_json = serde_json::to_string(run_type).unwrap_or_default();
    hasher.update(run_type_json.as_bytes());

    hasher.update(solver_version.as_bytes());

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunType;
    use serde_json::json;

    fn transient(duration_s: f64) -> RunType {
        RunType::Transient {
            duration_s,
            dt_override_s: None,
            record_every: 1,
        }
    }

    #[test]
    fn hash_stability() {
        let doc = json!({"name": "net", "elements": []});
        let a = compute_run_id(&doc, &transient(10.0), "v1");
        let b = compute_run_id(&doc, &transient(10.0), "v1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let doc1 = json!({"name": "net1"});
        let doc2 = json!({"name": "net2"});
        let base = compute_run_id(&doc1, &transient(10.0), "v1");
        assert_ne!(base, compute_run_id(&doc2, &transient(10.0), "v1"));
        assert_ne!(base, compute_run_id(&doc1, &transient(20.0), "v1"));
        assert_ne!(base, compute_run_id(&doc1, &transient(10.0), "v2"));
    }
}

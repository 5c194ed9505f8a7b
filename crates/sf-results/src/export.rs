//! CSV export for spreadsheet consumers.

use crate::types::NodeSample;

/// `time_s,head_m,flow_m3s` rows for one node.
pub fn series_csv(samples: &[NodeSample]) -> String {
    let mut out = String::from("time_s,head_m,flow_m3s\n");
    for s in samples {
        out.push_str(&format!("{},{},{}\n", s.time_s, s.head_m, s.flow_m3s));
    }
    out
}

/// `time_s,<field>` rows for one element output.
pub fn element_csv(field: &str, samples: &[(f64, f64)]) -> String {
    let mut out = format!("time_s,{field}\n");
    for (t, v) in samples {
        out.push_str(&format!("{t},{v}\n"));
    }
    out
}

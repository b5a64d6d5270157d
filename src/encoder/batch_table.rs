use serde::{Deserialize, Serialize};

/// Per-primitive feature metadata written into a b3dm batch table.
///
/// The four arrays are parallel: entry `i` describes batch id `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTable {
    #[serde(rename = "batchId")]
    pub batch_ids: Vec<u16>,
    #[serde(rename = "name")]
    pub names: Vec<String>,
    pub max_point: Vec<[f64; 3]>,
    pub min_point: Vec<[f64; 3]>,
}

impl BatchTable {
    /// Number of features (primitives) recorded.
    pub fn len(&self) -> usize {
        self.batch_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch_ids.is_empty()
    }

    /// Record one primitive's id, name and position bounds.
    pub fn push(&mut self, batch_id: u16, name: impl Into<String>, min: [f64; 3], max: [f64; 3]) {
        self.batch_ids.push(batch_id);
        self.names.push(name.into());
        self.min_point.push(min);
        self.max_point.push(max);
    }

    /// Combined `[min, max]` over every recorded primitive, or `None` when
    /// the table is empty.
    pub fn extents(&self) -> Option<([f64; 3], [f64; 3])> {
        if self.is_empty() {
            return None;
        }
        let mut min = [f64::MAX; 3];
        let mut max = [f64::MIN; 3];
        for (lo, hi) in self.min_point.iter().zip(&self.max_point) {
            for axis in 0..3 {
                min[axis] = min[axis].min(lo[axis]);
                max[axis] = max[axis].max(hi[axis]);
            }
        }
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_stay_parallel() {
        let mut bt = BatchTable::default();
        assert!(bt.is_empty());
        assert!(bt.extents().is_none());

        bt.push(0, "wall", [0.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
        bt.push(1, "roof", [-1.0, 1.0, 0.5], [0.5, 4.0, 2.0]);
        assert_eq!(bt.len(), 2);
        assert_eq!(bt.names.len(), bt.max_point.len());
        assert_eq!(bt.min_point.len(), bt.batch_ids.len());

        let (min, max) = bt.extents().unwrap();
        assert_eq!(min, [-1.0, 0.0, 0.0]);
        assert_eq!(max, [1.0, 4.0, 3.0]);
    }

    #[test]
    fn json_keys_match_b3dm_convention() {
        let mut bt = BatchTable::default();
        bt.push(0, "a", [0.0; 3], [1.0; 3]);
        let v = serde_json::to_value(&bt).unwrap();
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        assert!(keys.contains(&"batchId"));
        assert!(keys.contains(&"name"));
        assert!(keys.contains(&"maxPoint"));
        assert!(keys.contains(&"minPoint"));
        assert_eq!(v["name"][0], "a");
    }
}

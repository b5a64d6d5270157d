use serde::{Deserialize, Serialize};

use crate::math::MinMax;

/// A tile's spatial extent. Exactly one shape is populated.
///
/// Serializes as `{"region": [...]}`, `{"box": [...]}` or `{"sphere": [...]}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundingVolume {
    /// west, south, east, north (radians), min height, max height (metres).
    Region([f64; 6]),
    /// Center followed by the x, y and z half-axis vectors.
    Box([f64; 12]),
    /// Center and radius.
    Sphere([f64; 4]),
}

impl Default for BoundingVolume {
    fn default() -> Self {
        BoundingVolume::Region([0.0; 6])
    }
}

impl BoundingVolume {
    pub fn region(&self) -> Option<&[f64; 6]> {
        match self {
            BoundingVolume::Region(r) => Some(r),
            _ => None,
        }
    }
}

/// Tile refinement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Refine {
    Add,
    Replace,
}

/// Payload reference: a `.b3dm` file or a nested `tileset.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_volume: Option<BoundingVolume>,
    pub url: String,
}

/// One node of the tile hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    /// Column-major local-to-ECEF matrix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f64; 16]>,
    pub bounding_volume: BoundingVolume,
    #[serde(default)]
    pub geometric_error: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refine: Option<Refine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<TileContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Tile>,
    /// Mesh-local extents before geodetic placement; only used to compare
    /// tiles against each other.
    #[serde(skip)]
    pub original_x: MinMax,
    #[serde(skip)]
    pub original_y: MinMax,
    #[serde(skip)]
    pub original_z: MinMax,
}

impl Tile {
    /// Divide every child error by `factor` until it drops below its
    /// parent's, then repeat for the child's own subtree.
    ///
    /// `factor` must be greater than 1.
    pub fn reset_geometric_errors(&mut self, factor: f64) {
        if self.children.is_empty() || self.geometric_error <= 0.0 {
            return;
        }
        let parent = self.geometric_error;
        for child in &mut self.children {
            if !child.geometric_error.is_finite() {
                child.geometric_error = parent / factor;
            }
            while child.geometric_error >= parent {
                child.geometric_error /= factor;
            }
            child.reset_geometric_errors(factor);
        }
    }

    /// Sum of the three original extents.
    pub fn bounding_size(&self) -> f64 {
        self.original_x.extent() + self.original_y.extent() + self.original_z.extent()
    }

    /// Number of tiles in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Tile::count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetAsset {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileset_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gltf_up_axis: Option<String>,
}

impl Default for TilesetAsset {
    fn default() -> Self {
        Self {
            version: "0.0".into(),
            tileset_version: Some(format!("1.0.0-{}", env!("CARGO_PKG_NAME"))),
            gltf_up_axis: Some("Y".into()),
        }
    }
}

/// A `tileset.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tileset {
    pub asset: TilesetAsset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
    pub geometric_error: f64,
    pub root: Tile,
}

impl Default for Tileset {
    fn default() -> Self {
        Self {
            asset: TilesetAsset::default(),
            properties: None,
            geometric_error: 200.0,
            root: Tile::default(),
        }
    }
}

impl Tileset {
    /// Make geometric error non-increasing with depth. Factors `<= 1` are
    /// ignored since they would never terminate.
    pub fn reset_geometric_errors(&mut self, factor: f64) {
        if factor <= 1.0 {
            return;
        }
        self.root.reset_geometric_errors(factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(err: f64) -> Tile {
        Tile {
            geometric_error: err,
            ..Default::default()
        }
    }

    fn assert_monotone(t: &Tile) {
        for c in &t.children {
            assert!(c.geometric_error <= t.geometric_error);
            assert_monotone(c);
        }
    }

    #[test]
    fn bounding_volume_serializes_as_single_key() {
        let bv = BoundingVolume::Sphere([1.0, 2.0, 3.0, 4.0]);
        let json = serde_json::to_string(&bv).unwrap();
        assert_eq!(json, r#"{"sphere":[1.0,2.0,3.0,4.0]}"#);
        let back: BoundingVolume = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bv);
        assert!(back.region().is_none());
    }

    #[test]
    fn tile_skips_absent_fields() {
        let t = Tile {
            bounding_volume: BoundingVolume::Region([0.0, 0.0, 1.0, 1.0, 0.0, 10.0]),
            geometric_error: 5.0,
            refine: Some(Refine::Add),
            ..Default::default()
        };
        let json = serde_json::to_value(&t).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("transform"));
        assert!(!obj.contains_key("content"));
        assert!(!obj.contains_key("children"));
        assert!(!obj.contains_key("originalX"));
        assert_eq!(obj["refine"], "ADD");
        assert_eq!(obj["geometricError"], 5.0);
    }

    #[test]
    fn reset_divides_until_below_parent() {
        let mut root = Tile {
            geometric_error: 250.0,
            children: vec![
                Tile {
                    geometric_error: 500.0,
                    children: vec![leaf(400.0), leaf(10.0)],
                    ..Default::default()
                },
                leaf(100.0),
            ],
            ..Default::default()
        };
        root.reset_geometric_errors(2.0);
        // 500 -> 250 is still not below the parent, so it halves again
        assert_eq!(root.children[0].geometric_error, 125.0);
        assert_eq!(root.children[0].children[0].geometric_error, 100.0);
        assert_eq!(root.children[0].children[1].geometric_error, 10.0);
        assert_eq!(root.children[1].geometric_error, 100.0);
        assert_monotone(&root);
    }

    #[test]
    fn zero_error_parent_leaves_children_alone() {
        let mut root = Tile {
            geometric_error: 0.0,
            children: vec![leaf(20.0)],
            ..Default::default()
        };
        root.reset_geometric_errors(2.0);
        assert_eq!(root.children[0].geometric_error, 20.0);
    }

    #[test]
    fn tileset_ignores_non_shrinking_factor() {
        let mut ts = Tileset {
            root: Tile {
                geometric_error: 10.0,
                children: vec![leaf(10.0)],
                ..Default::default()
            },
            ..Default::default()
        };
        ts.reset_geometric_errors(1.0);
        assert_eq!(ts.root.children[0].geometric_error, 10.0);
        ts.reset_geometric_errors(2.0);
        assert_eq!(ts.root.children[0].geometric_error, 5.0);

        ts.root.children[0].children.push(leaf(40.0));
        ts.reset_geometric_errors(2.0);
        assert_eq!(ts.root.children[0].children[0].geometric_error, 2.5);
        assert_eq!(ts.root.count(), 3);
    }

    #[test]
    fn tileset_round_trip_keeps_shape() {
        let ts = Tileset {
            geometric_error: 500.0,
            root: Tile {
                transform: Some(crate::transform::identity_transform()),
                bounding_volume: BoundingVolume::Region([-0.1, -0.2, 0.1, 0.2, 0.0, 40.0]),
                geometric_error: 250.0,
                refine: Some(Refine::Add),
                children: vec![
                    Tile {
                        content: Some(TileContent {
                            bounding_volume: None,
                            url: "BatchedModels/a.b3dm".into(),
                        }),
                        ..leaf(20.0)
                    },
                    leaf(10.0),
                ],
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&ts).unwrap();
        let back: Tileset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
        assert_eq!(back.root.children.len(), 2);
        assert_eq!(
            back.root.children[0].content.as_ref().unwrap().url,
            "BatchedModels/a.b3dm"
        );
    }

    #[test]
    fn bounding_size_sums_extents() {
        let t = Tile {
            original_x: MinMax::new(0.0, 2.0),
            original_y: MinMax::new(-1.0, 1.0),
            original_z: MinMax::new(5.0, 8.0),
            ..Default::default()
        };
        assert_eq!(t.bounding_size(), 7.0);
    }
}

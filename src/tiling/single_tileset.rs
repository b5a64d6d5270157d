use std::f64::consts::FRAC_PI_2;

use crate::config::{BoundingVolumeKind, DEFAULT_LATITUDE, DEFAULT_LONGITUDE, GisPosition};
use crate::error::{ObjTilesError, Result};
use crate::math::MinMax;
use crate::transform::{meters_to_latitude, meters_to_longitude, wgs84_transform};
use crate::types::{BoundingVolume, Tile, TileContent, Tileset, TilesetAsset};

/// Placement and extents of one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetCreationOptions {
    /// Radians.
    pub longitude: f64,
    /// Radians.
    pub latitude: f64,
    pub min_height: f64,
    pub max_height: f64,
    /// East-west size in metres.
    pub tile_width: f64,
    /// North-south size in metres.
    pub tile_height: f64,
    pub trans_height: f64,
    /// Centre offset from the anchor, metres east.
    pub offset_x: f64,
    /// Centre offset from the anchor, metres south.
    pub offset_y: f64,
    pub geometric_error: f64,
    pub gltf_up_axis: String,
    pub bounding_volume: BoundingVolumeKind,
    pub original_x: MinMax,
    pub original_y: MinMax,
    pub original_z: MinMax,
}

impl Default for TilesetCreationOptions {
    fn default() -> Self {
        Self {
            longitude: DEFAULT_LONGITUDE,
            latitude: DEFAULT_LATITUDE,
            min_height: 0.0,
            max_height: 40.0,
            tile_width: 200.0,
            tile_height: 200.0,
            trans_height: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            geometric_error: 200.0,
            gltf_up_axis: "Y".into(),
            bounding_volume: BoundingVolumeKind::Region,
            original_x: MinMax::default(),
            original_y: MinMax::default(),
            original_z: MinMax::default(),
        }
    }
}

impl TilesetCreationOptions {
    /// Derive placement from Y-up mesh extents: X east, Z south, Y up.
    ///
    /// The mesh is lifted so its lowest point sits at height zero.
    pub fn from_extents(min: [f64; 3], max: [f64; 3]) -> Self {
        let tile_width = (max[0] - min[0]).ceil();
        let tile_height = (max[2] - min[2]).ceil();
        let trans_height = -min[1];
        Self {
            tile_width,
            tile_height,
            offset_x: tile_width / 2.0 + min[0],
            offset_y: tile_height / 2.0 + min[2],
            trans_height,
            min_height: min[1] + trans_height,
            max_height: max[1] + trans_height,
            original_x: MinMax::new(min[0], max[0]),
            original_y: MinMax::new(min[1], max[1]),
            original_z: MinMax::new(min[2], max[2]),
            ..Default::default()
        }
    }

    pub fn set_position(&mut self, position: &GisPosition) {
        self.longitude = position.longitude;
        self.latitude = position.latitude;
        if let Some(h) = position.trans_height {
            self.trans_height = h;
        }
    }

    fn height(&self) -> f64 {
        self.max_height - self.min_height
    }

    /// `[west, south, east, north, min height, max height]`.
    pub fn region(&self) -> [f64; 6] {
        let lon_extent = meters_to_longitude(self.tile_width, self.latitude);
        let lat_extent = meters_to_latitude(self.tile_height);
        let x_shift = self.offset_x / self.tile_width * lon_extent;
        let y_shift = self.offset_y / self.tile_height * lat_extent;
        // Zero-sized tiles have no shift rather than NaN
        let x_shift = if x_shift.is_finite() { x_shift } else { 0.0 };
        let y_shift = if y_shift.is_finite() { y_shift } else { 0.0 };
        [
            self.longitude - lon_extent / 2.0 + x_shift,
            self.latitude - lat_extent / 2.0 - y_shift,
            self.longitude + lon_extent / 2.0 + x_shift,
            self.latitude + lat_extent / 2.0 - y_shift,
            self.min_height,
            self.max_height,
        ]
    }

    pub fn box_volume(&self) -> [f64; 12] {
        let h = self.height();
        [
            self.offset_x,
            -self.offset_y,
            h / 2.0 + self.min_height,
            self.tile_width / 2.0,
            0.0,
            0.0,
            0.0,
            self.tile_height / 2.0,
            0.0,
            0.0,
            0.0,
            h / 2.0,
        ]
    }

    pub fn sphere(&self) -> [f64; 4] {
        let h = self.height();
        let radius = (self.tile_width.powi(2) / 4.0
            + self.tile_height.powi(2) / 4.0
            + h.powi(2) / 4.0)
            .sqrt();
        [self.offset_x, -self.offset_y, h / 2.0 + self.min_height, radius]
    }

    pub fn bounding_volume(&self) -> BoundingVolume {
        match self.bounding_volume {
            BoundingVolumeKind::Region => BoundingVolume::Region(self.region()),
            BoundingVolumeKind::Box => BoundingVolume::Box(self.box_volume()),
            BoundingVolumeKind::Sphere => BoundingVolume::Sphere(self.sphere()),
        }
    }

    fn check_anchor(&self) -> Result<()> {
        if !self.longitude.is_finite()
            || !self.latitude.is_finite()
            || self.latitude.abs() > FRAC_PI_2
        {
            return Err(ObjTilesError::Geodesy(format!(
                "invalid anchor ({}, {}) radians",
                self.longitude, self.latitude
            )));
        }
        Ok(())
    }

    /// The root tile of a one-payload tileset: anchored transform, the
    /// chosen bounding volume and a content reference to `tile_name`.
    pub fn create_tile(&self, tile_name: &str) -> Result<Tile> {
        self.check_anchor()?;
        Ok(Tile {
            transform: Some(wgs84_transform(
                self.longitude,
                self.latitude,
                self.trans_height,
            )),
            bounding_volume: self.bounding_volume(),
            geometric_error: 0.0,
            refine: None,
            content: Some(TileContent {
                bounding_volume: None,
                url: tile_name.to_string(),
            }),
            children: Vec::new(),
            original_x: self.original_x,
            original_y: self.original_y,
            original_z: self.original_z,
        })
    }
}

/// A standalone tileset with a single root tile pointing at `tile_name`.
pub fn create_single_tileset(tile_name: &str, options: &TilesetCreationOptions) -> Result<Tileset> {
    Ok(Tileset {
        asset: TilesetAsset {
            gltf_up_axis: Some(options.gltf_up_axis.clone()),
            ..Default::default()
        },
        properties: None,
        geometric_error: options.geometric_error,
        root: options.create_tile(tile_name)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_region_is_centred_on_anchor() {
        let o = TilesetCreationOptions::default();
        let r = o.region();
        assert_relative_eq!((r[0] + r[2]) / 2.0, o.longitude, epsilon = 1e-12);
        assert_relative_eq!((r[1] + r[3]) / 2.0, o.latitude, epsilon = 1e-12);
        assert_relative_eq!(r[2] - r[0], meters_to_longitude(200.0, o.latitude), epsilon = 1e-12);
        assert_relative_eq!(r[3] - r[1], meters_to_latitude(200.0), epsilon = 1e-12);
        assert_eq!(r[4], 0.0);
        assert_eq!(r[5], 40.0);
    }

    #[test]
    fn offsets_shift_region_east_and_south() {
        let o = TilesetCreationOptions {
            offset_x: 100.0,
            offset_y: 50.0,
            ..Default::default()
        };
        let base = TilesetCreationOptions::default().region();
        let r = o.region();
        let lon_extent = meters_to_longitude(200.0, o.latitude);
        let lat_extent = meters_to_latitude(200.0);
        assert_relative_eq!(r[0] - base[0], lon_extent / 2.0, epsilon = 1e-12);
        assert_relative_eq!(base[1] - r[1], lat_extent / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn box_and_sphere_from_extents() {
        let o = TilesetCreationOptions {
            tile_width: 4.0,
            tile_height: 6.0,
            min_height: 2.0,
            max_height: 14.0,
            offset_x: 1.0,
            offset_y: 3.0,
            ..Default::default()
        };
        assert_eq!(
            o.box_volume(),
            [1.0, -3.0, 8.0, 2.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 6.0]
        );
        let s = o.sphere();
        assert_eq!(&s[0..3], &[1.0, -3.0, 8.0]);
        assert_relative_eq!(s[3], (4.0f64 + 9.0 + 36.0).sqrt());
    }

    #[test]
    fn options_from_batch_extents() {
        let o = TilesetCreationOptions::from_extents([-2.5, -1.0, 10.0], [7.2, 9.0, 13.0]);
        assert_eq!(o.tile_width, 10.0);
        assert_eq!(o.tile_height, 3.0);
        assert_eq!(o.offset_x, 2.5);
        assert_eq!(o.offset_y, 11.5);
        assert_eq!(o.trans_height, 1.0);
        assert_eq!(o.min_height, 0.0);
        assert_eq!(o.max_height, 10.0);
        assert_eq!(o.original_z, MinMax::new(10.0, 13.0));
    }

    #[test]
    fn set_position_overrides_anchor() {
        let mut o = TilesetCreationOptions::from_extents([0.0, -5.0, 0.0], [1.0, 1.0, 1.0]);
        o.set_position(&GisPosition {
            longitude: 0.1,
            latitude: 0.2,
            trans_height: None,
        });
        assert_eq!((o.longitude, o.latitude, o.trans_height), (0.1, 0.2, 5.0));
        o.set_position(&GisPosition {
            longitude: 0.1,
            latitude: 0.2,
            trans_height: Some(-3.0),
        });
        assert_eq!(o.trans_height, -3.0);
    }

    #[test]
    fn single_tileset_shape() {
        let o = TilesetCreationOptions {
            bounding_volume: BoundingVolumeKind::Sphere,
            ..Default::default()
        };
        let ts = create_single_tileset("model.b3dm", &o).unwrap();
        assert_eq!(ts.geometric_error, 200.0);
        assert_eq!(ts.root.geometric_error, 0.0);
        assert!(matches!(ts.root.bounding_volume, BoundingVolume::Sphere(_)));
        assert_eq!(ts.root.content.as_ref().unwrap().url, "model.b3dm");
        assert_eq!(ts.root.transform.unwrap()[15], 1.0);

        let json = serde_json::to_value(&ts).unwrap();
        assert_eq!(json["asset"]["version"], "0.0");
        assert_eq!(json["asset"]["gltfUpAxis"], "Y");
        assert!(json["root"]["boundingVolume"]["sphere"].is_array());
    }

    #[test]
    fn bad_anchor_is_a_geodesy_error() {
        let o = TilesetCreationOptions {
            latitude: 2.0,
            ..Default::default()
        };
        assert!(matches!(
            create_single_tileset("a.b3dm", &o),
            Err(ObjTilesError::Geodesy(_))
        ));
        let o = TilesetCreationOptions {
            longitude: f64::NAN,
            ..Default::default()
        };
        assert!(o.create_tile("a.b3dm").is_err());
    }
}

use std::fmt;

/// RGB reflectivity, components nominally in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn grey(v: f64) -> Self {
        Self::new(v, v, v)
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_rgba(self, alpha: f64) -> [f64; 4] {
        [self.r, self.g, self.b, alpha]
    }

    /// Relative luminance (Rec. 709 weights).
    pub fn luminance(self) -> f64 {
        0.2125 * self.r + 0.7154 * self.g + 0.0721 * self.b
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} {:.4} {:.4}", self.r, self.g, self.b)
    }
}

/// Spectral curve reference (`Ka spectral file.rfl factor`).
#[derive(Debug, Clone, PartialEq)]
pub struct Spectral {
    pub filename: String,
    pub factor: f64,
}

/// CIE XYZ reflectivity (`Ka xyz x y z`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One MTL reflectivity statement. Only the RGB form takes part in
/// material conversion; the other forms are carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Reflectivity {
    Color(Color),
    Spectral(Spectral),
    Xyz(Xyz),
}

impl Reflectivity {
    pub fn color(&self) -> Option<Color> {
        match self {
            Reflectivity::Color(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Reflectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reflectivity::Color(c) => c.fmt(f),
            Reflectivity::Spectral(_) => f.write_str("unsupported: spectral"),
            Reflectivity::Xyz(_) => f.write_str("unsupported: xyz"),
        }
    }
}

/// `d` statement; 1.0 is fully opaque.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dissolve {
    pub factor: f64,
    pub halo: bool,
}

/// `Tr` statement; the complement of dissolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transparency {
    pub factor: f64,
}

/// A Wavefront material as read from an MTL library.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: Option<Reflectivity>,
    pub diffuse: Option<Reflectivity>,
    pub specular: Option<Reflectivity>,
    pub emissive: Option<Reflectivity>,
    /// `map_Kd`, relative to the OBJ folder.
    pub diffuse_texture: Option<String>,
    /// `map_Ka`, relative to the OBJ folder.
    pub ambient_texture: Option<String>,
    pub dissolve: Option<Dissolve>,
    pub transparency: Option<Transparency>,
    /// `Ns`, 0..=1000.
    pub specular_exponent: i32,
    pub optical_density: Option<f64>,
    pub illumination: Option<u8>,
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Opacity: dissolve if present, else `1 - Tr`, else opaque.
    pub fn alpha(&self) -> f64 {
        if let Some(d) = self.dissolve {
            return d.factor;
        }
        if let Some(t) = self.transparency {
            return 1.0 - t.factor;
        }
        1.0
    }
}

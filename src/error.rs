use std::io;

/// All error types for the obj-tiles conversion pipeline.
#[derive(thiserror::Error, Debug)]
pub enum ObjTilesError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Geodesy error: {0}")]
    Geodesy(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Tiling error: {0}")]
    Tiling(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ObjTilesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_strings() {
        let e = ObjTilesError::Input("vertex index 9 out of range".into());
        assert_eq!(e.to_string(), "Input error: vertex index 9 out of range");

        let e = ObjTilesError::Geodesy("point at ellipsoid center".into());
        assert_eq!(e.to_string(), "Geodesy error: point at ellipsoid center");

        let e = ObjTilesError::Encoding("json".into());
        assert_eq!(e.to_string(), "Encoding error: json");

        let e = ObjTilesError::Tiling("no tiles".into());
        assert_eq!(e.to_string(), "Tiling error: no tiles");

        let e = ObjTilesError::Output("disk full".into());
        assert_eq!(e.to_string(), "Output error: disk full");
    }

    #[test]
    fn from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let e: ObjTilesError = io_err.into();
        assert!(matches!(e, ObjTilesError::Io(_)));
        assert!(e.to_string().contains("file missing"));
    }

    #[test]
    fn from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: ObjTilesError = json_err.into();
        assert!(matches!(e, ObjTilesError::Json(_)));
    }
}

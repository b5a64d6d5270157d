//! Batched 3D Model (`.b3dm`) framing.
//!
//! Layout: a 28-byte header, feature table JSON and binary, batch table
//! JSON and binary, then the embedded GLB.

use serde::{Deserialize, Serialize};

use super::glb_writer::json_padded;
use crate::encoder::BatchTable;
use crate::error::{ObjTilesError, Result};

pub const MAGIC: &[u8; 4] = b"b3dm";
pub const VERSION: u32 = 1;
pub const HEADER_LENGTH: usize = 28;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FeatureTable {
    pub batch_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtc_center: Option<[f32; 3]>,
}

/// Parsed fixed header of a b3dm payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct B3dmHeader {
    pub version: u32,
    pub byte_length: u32,
    pub feature_table_json_length: u32,
    pub feature_table_binary_length: u32,
    pub batch_table_json_length: u32,
    pub batch_table_binary_length: u32,
}

impl B3dmHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LENGTH || &bytes[0..4] != MAGIC {
            return Err(ObjTilesError::Encoding("not a b3dm payload".into()));
        }
        let word = |i: usize| {
            let at = 4 + 4 * i;
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        Ok(Self {
            version: word(0),
            byte_length: word(1),
            feature_table_json_length: word(2),
            feature_table_binary_length: word(3),
            batch_table_json_length: word(4),
            batch_table_binary_length: word(5),
        })
    }

    /// Byte offset of the embedded GLB.
    pub fn glb_offset(&self) -> usize {
        HEADER_LENGTH
            + self.feature_table_json_length as usize
            + self.feature_table_binary_length as usize
            + self.batch_table_json_length as usize
            + self.batch_table_binary_length as usize
    }
}

/// A b3dm payload ready to be framed.
#[derive(Debug, Clone)]
pub struct B3dm {
    pub feature_table: FeatureTable,
    pub batch_table: Option<BatchTable>,
    pub glb: Vec<u8>,
}

impl B3dm {
    /// `BATCH_LENGTH` is the number of features recorded in `batch_table`.
    pub fn new(glb: Vec<u8>, batch_table: Option<BatchTable>) -> Self {
        let batch_length = batch_table.as_ref().map_or(0, |bt| bt.max_point.len());
        Self {
            feature_table: FeatureTable {
                batch_length,
                rtc_center: None,
            },
            batch_table,
            glb,
        }
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let feature_json = serde_json::to_vec(&self.feature_table)?;
        let feature_json = json_padded(&feature_json, 8, HEADER_LENGTH);
        let batch_json = match &self.batch_table {
            Some(bt) => json_padded(&serde_json::to_vec(bt)?, 8, 0),
            None => Vec::new(),
        };

        let byte_length = HEADER_LENGTH + feature_json.len() + batch_json.len() + self.glb.len();
        let byte_length = u32::try_from(byte_length)
            .map_err(|_| ObjTilesError::Encoding(format!("b3dm too large: {byte_length} bytes")))?;

        let mut out = Vec::with_capacity(byte_length as usize);
        out.extend_from_slice(MAGIC);
        for word in [
            VERSION,
            byte_length,
            feature_json.len() as u32,
            0,
            batch_json.len() as u32,
            0,
        ] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(&feature_json);
        out.extend_from_slice(&batch_json);
        out.extend_from_slice(&self.glb);
        Ok(out)
    }
}

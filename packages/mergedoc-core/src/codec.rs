//! Byte encoding used by `save` and `load`: a four byte magic header followed by a JSON body
//! carrying the format version and the full change history.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::Change;
use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"MDOC";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SavedDocumentRef<'a> {
    format: u32,
    changes: Vec<&'a Change>,
}

#[derive(Deserialize)]
struct SavedDocument {
    format: u32,
    changes: Vec<Change>,
}

pub fn encode(changes: &[Arc<Change>]) -> Result<Vec<u8>> {
    let mut out = MAGIC.to_vec();
    serde_json::to_writer(
        &mut out,
        &SavedDocumentRef {
            format: FORMAT_VERSION,
            changes: changes.iter().map(|c| c.as_ref()).collect(),
        },
    )?;
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Vec<Change>> {
    let body = bytes
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| Error::Decode("missing document header".into()))?;
    let saved: SavedDocument =
        serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))?;
    if saved.format != FORMAT_VERSION {
        return Err(Error::Decode(format!(
            "unsupported format version {}",
            saved.format
        )));
    }
    Ok(saved.changes)
}

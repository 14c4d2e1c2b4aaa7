use super::CodecError;
use crate::roads::model::DisruptionRecord;

/// Pretty-printed JSON array with a trailing newline.
///
/// Field order comes from the struct declaration and the sorted extras map,
/// so identical collections always encode to identical bytes.
pub fn encode(records: &[DisruptionRecord]) -> Result<Vec<u8>, CodecError> {
    let mut out = serde_json::to_vec_pretty(records)?;
    out.push(b'\n');
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Vec<DisruptionRecord>, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

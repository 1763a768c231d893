use crate::{Error, Result};
use base64::{Engine, engine::general_purpose::STANDARD};

pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Wraps PNG bytes in a `data:image/png;base64,` URI.
pub fn png_data_uri(png: &[u8]) -> Result<String> {
    let encoded_len = base64::encoded_len(png.len(), true)
        .ok_or_else(|| Error::encoding("encoded length overflows usize"))?;
    let prefix_len = PNG_DATA_URI_PREFIX.len();

    let mut buffer = Vec::with_capacity(prefix_len + encoded_len);
    buffer.extend_from_slice(PNG_DATA_URI_PREFIX.as_bytes());
    buffer.resize(prefix_len + encoded_len, 0);

    let written = STANDARD
        .encode_slice(png, &mut buffer[prefix_len..])
        .map_err(|e| Error::encoding(e.to_string()))?;
    buffer.truncate(prefix_len + written);

    String::from_utf8(buffer).map_err(|e| Error::encoding(e.to_string()))
}

// Copyright 2018-2024 the Deno authors. MIT license.

use thiserror::Error;

pub const BOM_CHAR: char = '\u{FEFF}';

#[derive(Debug, Clone, Error, deno_error::JsError)]
#[class(type)]
#[error("The content is not valid UTF-8 (invalid byte sequence at offset {valid_up_to}).")]
pub struct DecodeError {
  pub valid_up_to: usize,
}

/// Strips the byte order mark if it exists from the provided text.
pub fn strip_bom(text: &str) -> &str {
  if text.starts_with(BOM_CHAR) {
    &text[BOM_CHAR.len_utf8()..]
  } else {
    text
  }
}

/// Decodes UTF-8 bytes into text without a leading byte order mark.
pub fn decode_utf8(bytes: &[u8]) -> Result<String, DecodeError> {
  match std::str::from_utf8(bytes) {
    Ok(text) => Ok(strip_bom(text).to_string()),
    Err(err) => Err(DecodeError {
      valid_up_to: err.valid_up_to(),
    }),
  }
}

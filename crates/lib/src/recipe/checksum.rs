use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::consts::SHA256_HEX_LEN;
use crate::recipe::ValidationError;

/// A sha256 digest in its canonical form: 64 lowercase hex characters.
///
/// Only constructible through [`FromStr`], so holding one means the string
/// has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Sha256Digest(String);

impl Sha256Digest {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Compare against a digest computed from content.
  pub fn matches(&self, actual_hex: &str) -> bool {
    self.0 == actual_hex
  }
}

impl FromStr for Sha256Digest {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let well_formed = s.len() == SHA256_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !well_formed {
      return Err(ValidationError::InvalidChecksum(s.to_string()));
    }
    Ok(Self(s.to_string()))
  }
}

impl fmt::Display for Sha256Digest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

//! Airline carrier code type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid carrier code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid carrier code: {reason}")]
pub struct InvalidCarrierCode {
    reason: &'static str,
}

/// A valid 2-character IATA airline designator.
///
/// Designators are 2 uppercase ASCII letters or digits (e.g., "BA", "LH",
/// "9W"). A designator made of two digits is not assignable and is rejected.
///
/// # Examples
///
/// ```
/// use fare_search::domain::CarrierCode;
///
/// let ba = CarrierCode::parse("BA").unwrap();
/// assert_eq!(ba.as_str(), "BA");
///
/// // Digits are allowed alongside a letter
/// assert!(CarrierCode::parse("9W").is_ok());
///
/// // Lowercase is rejected
/// assert!(CarrierCode::parse("ba").is_err());
///
/// // Wrong length is rejected
/// assert!(CarrierCode::parse("B").is_err());
/// assert!(CarrierCode::parse("BAW").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CarrierCode([u8; 2]);

impl CarrierCode {
    /// Parse a carrier code from a string.
    ///
    /// The input must be exactly 2 characters from A-Z or 0-9, with at
    /// least one letter.
    pub fn parse(s: &str) -> Result<Self, InvalidCarrierCode> {
        let bytes = s.as_bytes();

        if bytes.len() != 2 {
            return Err(InvalidCarrierCode {
                reason: "must be exactly 2 characters",
            });
        }

        for &b in bytes {
            if !(b.is_ascii_uppercase() || b.is_ascii_digit()) {
                return Err(InvalidCarrierCode {
                    reason: "must be uppercase ASCII letters A-Z or digits",
                });
            }
        }

        if bytes.iter().all(u8::is_ascii_digit) {
            return Err(InvalidCarrierCode {
                reason: "must contain at least one letter",
            });
        }

        Ok(CarrierCode([bytes[0], bytes[1]]))
    }

    /// Returns the carrier code as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII letters and digits are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl TryFrom<String> for CarrierCode {
    type Error = InvalidCarrierCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CarrierCode> for String {
    fn from(code: CarrierCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Debug for CarrierCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CarrierCode({})", self.as_str())
    }
}

impl fmt::Display for CarrierCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Kenyan mobile number normalization.
//!
//! The payment gateway only accepts numbers in bare international form
//! (`2547XXXXXXXX` / `2541XXXXXXXX`). Students type them in whatever way they
//! are used to, so input is rewritten before it is validated:
//!
//! ```text
//! 0712345678     -> 254712345678   (trunk prefix replaced by country code)
//! +254712345678  -> 254712345678   (international symbol stripped)
//! 254712345678   -> 254712345678
//! ```

use crate::error::{HostelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Country calling code for Kenya.
pub const COUNTRY_CODE: &str = "254";

/// Number of digits after the country code in a Kenyan mobile number.
const SUBSCRIBER_DIGITS: usize = 9;

/// A phone number in canonical `254XXXXXXXXX` form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize and validate user input.
    ///
    /// Whitespace and dashes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Validation`] when the input is empty or the
    /// normalized number is not a Kenyan mobile number.
    pub fn parse(input: &str) -> Result<Self> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();

        if compact.is_empty() {
            return Err(HostelError::validation("Phone number is required"));
        }

        let normalized = if let Some(rest) = compact.strip_prefix('+') {
            rest.to_string()
        } else if let Some(rest) = compact.strip_prefix('0') {
            format!("{COUNTRY_CODE}{rest}")
        } else {
            compact
        };

        if !Self::is_valid(&normalized) {
            return Err(HostelError::validation(format!(
                "Invalid phone number '{input}'. Use 07XXXXXXXX, 01XXXXXXXX or 254XXXXXXXXX"
            )));
        }

        Ok(Self(normalized))
    }

    /// Wrap a value read back from storage without re-validating it.
    #[must_use]
    pub const fn from_trusted(value: String) -> Self {
        Self(value)
    }

    fn is_valid(normalized: &str) -> bool {
        let Some(subscriber) = normalized.strip_prefix(COUNTRY_CODE) else {
            return false;
        };
        subscriber.len() == SUBSCRIBER_DIGITS
            && subscriber.chars().all(|c| c.is_ascii_digit())
            && matches!(subscriber.chars().next(), Some('7' | '1'))
    }

    /// The canonical digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_trunk_prefix_is_rewritten() {
        let phone = PhoneNumber::parse("0712345678").unwrap();
        assert_eq!(phone.as_str(), "254712345678");
    }

    #[test]
    fn test_plus_prefix_is_stripped() {
        let phone = PhoneNumber::parse("+254712345678").unwrap();
        assert_eq!(phone.as_str(), "254712345678");
    }

    #[test]
    fn test_canonical_form_is_kept() {
        let phone = PhoneNumber::parse("254112345678").unwrap();
        assert_eq!(phone.as_str(), "254112345678");
    }

    #[test]
    fn test_spaces_are_ignored() {
        let phone = PhoneNumber::parse(" 0712 345 678 ").unwrap();
        assert_eq!(phone.as_str(), "254712345678");
    }

    #[test]
    fn test_eight_digits_rejected() {
        let err = PhoneNumber::parse("07123456").unwrap_err();
        assert!(matches!(err, HostelError::Validation(_)));
    }

    #[test]
    fn test_non_numeric_rejected() {
        assert!(matches!(
            PhoneNumber::parse("07abcdefgh"),
            Err(HostelError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(PhoneNumber::parse("   ").is_err());
    }

    #[test]
    fn test_landline_prefix_rejected() {
        assert!(PhoneNumber::parse("0202345678").is_err());
    }

    proptest! {
        #[test]
        fn prop_local_and_international_forms_agree(rest in "[71][0-9]{8}") {
            let local = PhoneNumber::parse(&format!("0{rest}")).unwrap();
            let plus = PhoneNumber::parse(&format!("+254{rest}")).unwrap();
            let bare = PhoneNumber::parse(&format!("254{rest}")).unwrap();
            prop_assert_eq!(&local, &plus);
            prop_assert_eq!(&local, &bare);
            prop_assert_eq!(local.as_str().len(), 12);
        }

        #[test]
        fn prop_short_numbers_rejected(rest in "[0-9]{0,8}") {
            let input = format!("0{rest}");
            prop_assert!(PhoneNumber::parse(&input).is_err());
        }
    }
}

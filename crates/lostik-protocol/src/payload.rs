//! Message text validation and hexadecimal payload encoding
//!
//! Outbound text is restricted to `[A-Za-z0-9 .?!]`, 1 to 50 characters, so
//! that every message fits a single SF12 frame. On air it travels as the hex
//! rendering of its bytes.

use std::fmt;

use crate::error::PayloadError;

/// Maximum message length in characters
pub const MAX_MESSAGE_LEN: usize = 50;

/// Returns true if `c` may appear in an outbound message
fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '?' | '!')
}

/// Outbound message text that has passed validation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageText(String);

impl MessageText {
    /// Validate `text` and wrap it
    pub fn new(text: impl Into<String>) -> Result<Self, PayloadError> {
        let text = text.into();
        if text.is_empty() {
            return Err(PayloadError::Empty);
        }
        if let Some(c) = text.chars().find(|c| !is_allowed(*c)) {
            return Err(PayloadError::InvalidCharacter(c));
        }
        // Every allowed character is one byte, so len() counts characters here
        if text.len() > MAX_MESSAGE_LEN {
            return Err(PayloadError::TooLong {
                len: text.len(),
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(Self(text))
    }

    /// Get the text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for MessageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for MessageText {
    type Error = PayloadError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        Self::new(text)
    }
}

/// Render text as uppercase hexadecimal ASCII
pub fn encode_hex(text: &str) -> String {
    hex::encode_upper(text.as_bytes())
}

/// Decode a hexadecimal payload (either case) back to text
pub fn decode_hex(payload_hex: &str) -> Result<String, PayloadError> {
    let bytes =
        hex::decode(payload_hex.trim()).map_err(|e| PayloadError::InvalidHex(e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| PayloadError::NotText)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accepts_valid_text() {
        let text = MessageText::new("HELLO world. Are you there?!").unwrap();
        assert_eq!(text.as_str(), "HELLO world. Are you there?!");
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(MessageText::new(""), Err(PayloadError::Empty));
    }

    #[test]
    fn test_rejects_too_long() {
        let text = "A".repeat(51);
        assert_eq!(
            MessageText::new(text),
            Err(PayloadError::TooLong { len: 51, max: 50 })
        );
        assert!(MessageText::new("A".repeat(50)).is_ok());
    }

    #[test]
    fn test_rejects_invalid_characters() {
        assert_eq!(
            MessageText::new("hello, world"),
            Err(PayloadError::InvalidCharacter(','))
        );
        assert_eq!(
            MessageText::new("caf\u{e9}"),
            Err(PayloadError::InvalidCharacter('\u{e9}'))
        );
        assert!(MessageText::new("tab\there").is_err());
    }

    #[test]
    fn test_encode_hex() {
        assert_eq!(encode_hex("HELLO"), "48454C4C4F");
        assert_eq!(encode_hex(MessageText::new("Hi!").unwrap().as_str()), "486921");
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("48454C4C4F").unwrap(), "HELLO");
        assert_eq!(decode_hex("48454c4c4f").unwrap(), "HELLO");
        assert!(matches!(decode_hex("4845G"), Err(PayloadError::InvalidHex(_))));
        assert_eq!(decode_hex("FF"), Err(PayloadError::NotText));
    }

    proptest! {
        #[test]
        fn valid_text_is_accepted(text in "[A-Za-z0-9 .?!]{1,50}") {
            prop_assert!(MessageText::new(text).is_ok());
        }

        #[test]
        fn text_with_foreign_character_is_rejected(
            prefix in "[A-Za-z0-9]{0,20}",
            bad in "[^A-Za-z0-9 .?!]",
            suffix in "[A-Za-z0-9]{0,20}",
        ) {
            let text = format!("{}{}{}", prefix, bad, suffix);
            prop_assert!(MessageText::new(text).is_err());
        }

        #[test]
        fn overlong_text_is_rejected(text in "[A-Za-z0-9 .?!]{51,80}") {
            prop_assert!(
                matches!(MessageText::new(text), Err(PayloadError::TooLong { .. })),
                "expected TooLong"
            );
        }

        #[test]
        fn hex_round_trip(text in "[A-Za-z0-9 .?!]{1,50}") {
            let message = MessageText::new(text.clone()).unwrap();
            prop_assert_eq!(decode_hex(&encode_hex(message.as_str())).unwrap(), text);
        }
    }
}

//! UTF-8 well-formedness and embedded-NUL scanning over raw bytes — the "String Validator"
//! component (§2) shared by key validation, BSON string decoding, and cstring framing.

use crate::error::{Error, Result};

/// Validates that `bytes` is well-formed UTF-8, returning the decoded `String`. Used for the
/// BSON "string" type, where embedded NUL bytes are legal (the framing is length-prefixed, not
/// NUL-terminated).
pub fn validate_utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes).map(str::to_owned).map_err(|e| {
        tracing::debug!(len = bytes.len(), error = %e, "not valid UTF-8");
        Error::invalid_string_data(format!("not valid UTF-8: {e}"))
    })
}

/// Validates that `s` contains no embedded NUL byte, for cstring-framed fields (keys, regex
/// patterns, regex flags) where NUL is the terminator and therefore cannot appear in the body.
pub fn validate_no_embedded_nul(s: &str, what: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        tracing::debug!(what, "embedded NUL byte");
        return Err(Error::invalid_document(format!(
            "{what} must not contain an embedded NUL byte"
        )));
    }
    Ok(())
}

/// Validates a document key under the rules in §4.1: always reject embedded NUL; when
/// `check_keys` is set, also reject a leading `$` and any `.`.
pub fn validate_key(key: &str, check_keys: bool) -> Result<()> {
    validate_no_embedded_nul(key, "a document key")?;
    if check_keys {
        if key.starts_with('$') {
            tracing::debug!(key, "key must not start with '$'");
            return Err(Error::invalid_document(format!(
                "key '{key}' must not start with '$'"
            )));
        }
        if key.contains('.') {
            tracing::debug!(key, "key must not contain '.'");
            return Err(Error::invalid_document(format!(
                "key '{key}' must not contain '.'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_embedded_nul_in_key() {
        assert!(validate_key("a\0b", false).is_err());
    }

    #[test]
    fn rejects_dollar_prefix_only_when_checked() {
        assert!(validate_key("$set", true).is_err());
        assert!(validate_key("$set", false).is_ok());
    }

    #[test]
    fn rejects_dot_only_when_checked() {
        assert!(validate_key("a.b", true).is_err());
        assert!(validate_key("a.b", false).is_ok());
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(validate_utf8(&[0xff, 0xfe]).is_err());
    }
}

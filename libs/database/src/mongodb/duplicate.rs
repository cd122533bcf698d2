use mongodb::error::{Error, ErrorKind, WriteFailure};
use regex::Regex;
use std::sync::LazyLock;

const DUPLICATE_KEY_CODE: i32 = 11000;

static DUP_KEY_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"dup key: \{\s*"?([A-Za-z0-9_.]+)"?\s*:"#).unwrap());

static INDEX_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"index: ([A-Za-z0-9_.]+?)(?:_-?1)*\s").unwrap());

/// The server message of an E11000 error, if `error` is one.
fn duplicate_key_message(error: &Error) -> Option<&str> {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE =>
        {
            Some(write_error.message.as_str())
        }
        ErrorKind::Command(command_error) if command_error.code == DUPLICATE_KEY_CODE => {
            Some(command_error.message.as_str())
        }
        _ => None,
    }
}

pub fn is_duplicate_key(error: &Error) -> bool {
    duplicate_key_message(error).is_some()
}

/// Name of the field that violated a unique index.
///
/// Returns `None` when `error` is not a duplicate-key error.
pub fn duplicate_key_field(error: &Error) -> Option<String> {
    duplicate_key_message(error)
        .map(|message| duplicate_key_field_from_message(message).unwrap_or_else(|| "value".to_string()))
}

/// Extracts the field from `... dup key: { email: "a@b.c" }`, falling back to
/// the index name with its `_1` suffixes stripped.
pub fn duplicate_key_field_from_message(message: &str) -> Option<String> {
    DUP_KEY_FIELD
        .captures(message)
        .or_else(|| INDEX_NAME.captures(message))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

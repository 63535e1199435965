//! POSIX shell quoting for values interpolated into remote command lines.

/// Quote `value` as a single POSIX shell word.
///
/// Plain words made only of safe characters are returned unchanged; anything
/// else is wrapped in single quotes with embedded quotes spliced as `'\''`.
#[must_use]
pub fn quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:=@%,".contains(c));
    if safe {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Escape `%` for OpenSSH options that expand `%` tokens, such as
/// `ProxyCommand`, `IdentityFile` and `UserKnownHostsFile`.
#[must_use]
pub fn escape_tokens(value: &str) -> String {
    value.replace('%', "%%")
}

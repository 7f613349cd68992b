// ABOUTME: POSIX shell quoting for remote command construction.
// ABOUTME: Uses shell-escape so paths with spaces or quotes survive `sh -c`.

use std::borrow::Cow;

/// Quote `value` as one POSIX shell word. Safe words are left untouched.
pub fn quote(value: &str) -> String {
    shell_escape::unix::escape(Cow::Borrowed(value)).into_owned()
}

/// Join a base directory and a child name without doubling slashes.
pub fn join(base: &str, child: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), child)
}

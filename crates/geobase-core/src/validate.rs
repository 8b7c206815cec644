//! Input validators for e-mail addresses, passwords and attachment filenames.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$",
  )
  .expect("valid e-mail pattern")
});

static FILENAME: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[\w\-. ]+$").expect("valid filename pattern"));

pub fn is_valid_email(email: &str) -> bool { EMAIL.is_match(email) }

/// At least eight characters, with a digit, an upper-case letter, a
/// lower-case letter and one character outside `[A-Za-z0-9]`.
pub fn is_strong_password(password: &str) -> bool {
  password.chars().count() >= 8
    && password.chars().any(|c| c.is_ascii_digit())
    && password.chars().any(|c| c.is_ascii_uppercase())
    && password.chars().any(|c| c.is_ascii_lowercase())
    && password.chars().any(|c| !c.is_ascii_alphanumeric())
}

/// Word characters, dashes, dots and spaces only. Rules out path separators.
pub fn is_valid_filename(name: &str) -> bool {
  FILENAME.is_match(name) && name != "." && name != ".."
}

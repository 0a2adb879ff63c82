use std::{fmt, str::FromStr, sync::LazyLock};

use rand::Rng;
use regex::Regex;
use snafu::{OptionExt, Snafu};

const TOKEN_ID_LENGTH: usize = 6;
const TOKEN_SECRET_LENGTH: usize = 16;
const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub(crate) static BOOTSTRAP_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<id>[a-z0-9]{6})\.(?P<secret>[a-z0-9]{16})$")
        .expect("failed to compile bootstrap token regex")
});

#[derive(Debug, PartialEq, Snafu)]
#[snafu(display("the bootstrap token does not match the pattern {pattern:?}"))]
pub struct ParseBootstrapTokenError {
    pattern: &'static str,
}

/// A bootstrap token in the `<id>.<secret>` form, for example
/// `abcdef.0123456789abcdef`.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapTokenString {
    id: String,
    secret: String,
}

impl BootstrapTokenString {
    /// Generates a new random token.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut random_string = |length: usize| -> String {
            (0..length)
                .map(|_| TOKEN_CHARSET[rng.random_range(0..TOKEN_CHARSET.len())] as char)
                .collect()
        };

        Self {
            id: random_string(TOKEN_ID_LENGTH),
            secret: random_string(TOKEN_SECRET_LENGTH),
        }
    }

    /// The public part of the token.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl FromStr for BootstrapTokenString {
    type Err = ParseBootstrapTokenError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let captures = BOOTSTRAP_TOKEN_REGEX
            .captures(input)
            .context(ParseBootstrapTokenSnafu {
                pattern: "[a-z0-9]{6}.[a-z0-9]{16}",
            })?;

        Ok(Self {
            id: captures["id"].to_owned(),
            secret: captures["secret"].to_owned(),
        })
    }
}

impl fmt::Display for BootstrapTokenString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.secret)
    }
}

// The secret must never end up in logs.
impl fmt::Debug for BootstrapTokenString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapTokenString")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parse_valid_token() {
        let token = BootstrapTokenString::from_str("abcdef.0123456789abcdef").expect("valid token");
        assert_eq!(token.id(), "abcdef");
        assert_eq!(token.secret(), "0123456789abcdef");
        assert_eq!(token.to_string(), "abcdef.0123456789abcdef");
    }

    #[rstest]
    #[case("")]
    #[case("abcdef")]
    #[case("abcdef.0123456789abcde")]
    #[case("ABCDEF.0123456789abcdef")]
    #[case("abcdef:0123456789abcdef")]
    fn parse_invalid_token(#[case] input: &str) {
        BootstrapTokenString::from_str(input).expect_err("invalid token");
    }

    #[test]
    fn generated_tokens_parse() {
        let token = BootstrapTokenString::generate();
        let parsed =
            BootstrapTokenString::from_str(&token.to_string()).expect("generated token must parse");
        assert_eq!(parsed, token);
    }

    #[test]
    fn debug_hides_secret() {
        let token = BootstrapTokenString::from_str("abcdef.0123456789abcdef").expect("valid token");
        assert!(!format!("{token:?}").contains("0123456789abcdef"));
    }
}

use std::io::{self, Write};

use bootstrap_config::bootstrap_token::BootstrapTokenString;
use clap::Subcommand;
use snafu::{ResultExt as _, Snafu};
use tracing::debug;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to write output"))]
    WriteOutput { source: io::Error },
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Generate and print a random bootstrap token of the form
    /// `[a-z0-9]{6}.[a-z0-9]{16}`.
    Generate,
}

impl TokenCommand {
    pub fn run(self, out: &mut impl Write) -> Result<(), Error> {
        match self {
            Self::Generate => {
                let token = BootstrapTokenString::generate();
                debug!(id = token.id(), "generated bootstrap token");

                writeln!(out, "{token}").context(WriteOutputSnafu)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_parse() {
        let mut out = Vec::new();

        TokenCommand::Generate
            .run(&mut out)
            .expect("token must be written");

        let output = String::from_utf8(out).expect("output must be utf-8");
        let token: BootstrapTokenString = output
            .trim_end()
            .parse()
            .expect("generated token must parse");
        assert_eq!(token.to_string(), output.trim_end());
    }
}

use bootstrapctl::{Cli, Error};
use clap::Parser;

#[snafu::report]
fn main() -> Result<(), Error> {
    bootstrapctl::run(Cli::parse())
}

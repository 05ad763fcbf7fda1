use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "mailstat",
    version,
    about = "Count messages matching IMAP searches and report the counts"
)]
pub struct Cli {
    /// Configuration file [default: ~/.mailstat]
    #[arg(short, long, env = "MAILSTAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Dry run: process only the source (or the sources of the account) named NAME and print to stdout
    #[arg(long, value_name = "NAME")]
    pub test: Option<String>,

    /// Validate the configuration and exit without connecting anywhere
    #[arg(long, conflicts_with = "test")]
    pub check: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

use crate::session::Theme;
use clap::Parser;
use std::path::PathBuf;

/// Stream one analysis request and print its steps as they complete
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Message to send to the analysis agent
    pub message: String,

    /// Path to the configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the analysis backend
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Model name to request
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Keep every section expanded
    #[arg(long)]
    pub no_auto_collapse: bool,

    /// Terminal colour scheme (saved as a preference)
    #[arg(long, value_enum)]
    pub theme: Option<Theme>,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn parse() -> Self {
        <Args as Parser>::parse()
    }
}

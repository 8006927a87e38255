use clap::Parser;
use std::path::PathBuf;

use crate::core::nav_params::{NavParams, ParamStore};
use crate::entities::keys::{P_CAPTURE, P_OCCURRENCE};

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Images: png, jpeg, tiff\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Session playback navigator
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Session directory containing session.json and capture images
    #[arg(value_name = "SESSION_DIR")]
    pub session_dir: PathBuf,

    /// Capture to open first (overrides the one in --link)
    #[arg(long = "capture", value_name = "ID")]
    pub capture: Option<String>,

    /// Occurrence to highlight (can be specified multiple times)
    #[arg(long = "occurrence", value_name = "ID")]
    pub occurrences: Vec<String>,

    /// Shared navigation link, e.g. "capture=c42&occurrence=o7"
    #[arg(long = "link", value_name = "QUERY")]
    pub link: Option<String>,

    /// Snap plot clicks and prev/next to buckets with captures
    #[arg(long = "snap")]
    pub snap: bool,

    /// Enable debug logging to file (default: capview.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    /// Initial navigation state: `--link` first, then explicit flags on top.
    pub fn initial_params(&self) -> NavParams {
        let mut params = self
            .link
            .as_deref()
            .map(NavParams::parse)
            .unwrap_or_default();
        if let Some(capture) = &self.capture {
            params.set(P_CAPTURE, capture);
        }
        for occ in &self.occurrences {
            if !params.contains_value(P_OCCURRENCE, occ) {
                params.append(P_OCCURRENCE, occ);
            }
        }
        params
    }
}

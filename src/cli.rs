use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shortgrab")]
#[command(author, version, about = "Short-video and picture-post downloader with a Telegram bot and a web front end", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the web server and, when a token is configured, the bot
    Run,

    /// Run only the Telegram bot
    Bot,

    /// Run only the web server
    Web {
        /// Port to listen on (defaults to WEB_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Download a single URL through the pipeline and print the result
    Fetch {
        /// Link to a video or picture post
        url: String,

        /// Directory to keep the artifact in (defaults to DOWNLOAD_FOLDER)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

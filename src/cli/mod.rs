use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "transcript-sync",
    about = "Transcript Sync - Fetch YouTube caption transcripts and follow playback",
    version,
    long_about = "Fetches the caption transcript of a YouTube video through the same watch page and player API sequence the web player uses, and highlights the current line while playback advances."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and print the transcript of a video
    Fetch {
        /// Watch page URL (youtube.com/watch?v=... or youtu.be/...)
        #[arg(value_name = "URL")]
        url: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Preferred caption languages, most preferred first
        #[arg(short, long, value_name = "LANG", env = "TRANSCRIPT_SYNC_LANGS", value_delimiter = ',')]
        lang: Vec<String>,

        /// Include timestamps in text output (srt/vtt formats always include timestamps)
        #[arg(long)]
        timestamps: bool,
    },

    /// List the caption tracks offered for a video
    Tracks {
        /// Watch page URL
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Follow simulated playback and print each highlighted line
    Sync {
        /// Watch page URL
        #[arg(value_name = "URL")]
        url: String,

        /// Playback position to start from, in seconds
        #[arg(long, default_value = "0")]
        start: f64,

        /// Playback rate
        #[arg(long, default_value = "1.0")]
        rate: f64,

        /// Preferred caption languages, most preferred first
        #[arg(short, long, value_name = "LANG", env = "TRANSCRIPT_SYNC_LANGS", value_delimiter = ',')]
        lang: Vec<String>,
    },

    /// Print the video id contained in a URL
    Id {
        /// Page location to inspect
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Show or initialise the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON transcript
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
}

impl OutputFormat {
    /// Parse the format name stored in the configuration file
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "transcript-sync",
            "fetch",
            "https://youtu.be/dQw4w9WgXcQ",
            "--format",
            "srt",
            "--lang",
            "de,en",
        ])
        .unwrap();

        match cli.command {
            Commands::Fetch { url, format, lang, .. } => {
                assert_eq!(url, "https://youtu.be/dQw4w9WgXcQ");
                assert_eq!(format, Some(OutputFormat::Srt));
                assert_eq!(lang, vec!["de", "en"]);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(OutputFormat::from_name("VTT"), Some(OutputFormat::Vtt));
        assert_eq!(OutputFormat::from_name("csv"), None);
    }
}

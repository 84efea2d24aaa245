//! Clap derive structures for the `antenne` binary.

use std::path::PathBuf;

use clap::Parser;

use antenne_config::Overrides;

/// antenne -- presence-triggered audio relay for Discord
#[derive(Debug, Parser)]
#[command(
    name = "antenne",
    version,
    about = "Loop an audio playlist into a Discord voice channel while a Kick stream is live",
    long_about = "Watches a Kick channel and a Discord user. While the stream is live and the\n\
        user sits in the target voice channel, the bot joins that channel and loops\n\
        every track of the audio directory; as soon as either condition fails, it leaves.\n\n\
        Settings come from the config file, DISCORD_TOKEN / TARGET_* style environment\n\
        variables, ANTENNE_* variables, then these flags."
)]
pub struct Cli {
    /// Config file (TOML); defaults to the platform config directory
    #[arg(long, short = 'c', env = "ANTENNE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory of tracks to loop (overrides AUDIO_DIRECTORY)
    #[arg(long, value_name = "DIR")]
    pub audio_dir: Option<PathBuf>,

    /// Evaluation interval in milliseconds (overrides CHECK_INTERVAL_MS)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: Option<u64>,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Validate the configuration, print it with secrets masked, and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            audio_directory: self.audio_dir.clone(),
            check_interval_ms: self.interval_ms,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::try_parse_from(["antenne", "--audio-dir", "/srv/loop", "--interval-ms", "5000", "-vv"])
            .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.audio_directory, Some(PathBuf::from("/srv/loop")));
        assert_eq!(overrides.check_interval_ms, Some(5000));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Cli::try_parse_from(["antenne", "--interval-ms", "0"]).is_err());
    }
}

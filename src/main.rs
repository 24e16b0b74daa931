use crate::AppError::ConfigError;
use clap::Parser;
use config::Config;
use ruxtab::{GpVersion, RuxError as LibRuxError, Song, parse_gp_data, write_gp_data};
use std::io;
use std::path::PathBuf;

mod config;

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            // use Display instead of Debug for user friendly error messages
            log::error!("{err}");
            1
        }
    });
}

pub fn main_result() -> Result<(), AppError> {
    // setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("ruxtab=info"))
        .init();

    // args
    let args = CliArgs::parse();
    let tab_file_path = PathBuf::from(&args.tab_file_path);

    // check if tab file exists
    if !tab_file_path.exists() {
        let err = ConfigError(format!("Tab file not found {tab_file_path:?}"));
        return Err(err);
    }
    log::info!("Reading tab file {tab_file_path:?}");
    let file_data = std::fs::read(&tab_file_path)?;
    let mut song = parse_gp_data(&file_data)?;

    if args.json {
        let json = serde_json::to_string_pretty(&song)
            .map_err(|err| AppError::OtherError(format!("Could not serialize song {err}")))?;
        println!("{json}");
    } else {
        print_summary(&song);
    }

    if let Some(output) = args.output.map(PathBuf::from) {
        // read local config
        let local_config = Config::read_config()?;
        let target_version = args
            .target_version
            .or_else(|| local_config.get_target_version())
            .unwrap_or(song.version);
        if target_version != song.version {
            log::info!(
                "Converting from {} to {}",
                song.version.version_string(),
                target_version.version_string()
            );
            song.version = target_version;
        }
        let encoded = write_gp_data(&song)?;
        std::fs::write(&output, &encoded)?;
        log::info!("Wrote {} bytes to {output:?}", encoded.len());
    }
    Ok(())
}

fn print_summary(song: &Song) {
    let info = &song.song_info;
    println!("{}", song.version.version_string());
    println!("Title: {}", info.title);
    if !info.artist.is_empty() {
        println!("Artist: {}", info.artist);
    }
    if !info.album.is_empty() {
        println!("Album: {}", info.album);
    }
    println!("Tempo: {} ({})", song.tempo.value, song.tempo.name);
    if let Some(first) = song.measure_headers.first() {
        println!(
            "Time signature: {}/{}",
            first.time_signature.numerator, first.time_signature.denominator.value
        );
        println!("Key signature: {}", first.key_signature);
    }
    println!("Measures: {}", song.measure_headers.len());
    println!("Tracks: {}", song.tracks.len());
    for track in &song.tracks {
        let beat_count: usize = track
            .measures
            .iter()
            .flat_map(|measure| &measure.voices)
            .map(|voice| voice.beats.len())
            .sum();
        println!(
            "  {}. {} ({} strings, channel {}{}, {beat_count} beats)",
            track.number,
            track.name,
            track.string_count(),
            track.channel.channel_id + 1,
            if track.percussion { ", percussion" } else { "" },
        );
    }
}

fn parse_target_version(value: &str) -> Result<GpVersion, String> {
    match value {
        "5.00" => Ok(GpVersion::GP5),
        "5.10" => Ok(GpVersion::GP5_10),
        other => Err(format!("unknown version {other}, expected 5.00 or 5.10")),
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Guitar Pro 5 file.
    tab_file_path: String,
    /// Print the whole song as JSON instead of a summary.
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Optional path to write the song back to.
    #[arg(long)]
    output: Option<String>,
    /// Version of the written file (5.00 or 5.10), taken from the configuration or the source file otherwise.
    #[arg(long, value_parser = parse_target_version)]
    target_version: Option<GpVersion>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("parsing error: {0}")]
    ParsingError(String),
    #[error("other error: {0}")]
    OtherError(String),
}

impl From<LibRuxError> for AppError {
    fn from(error: LibRuxError) -> Self {
        match error {
            LibRuxError::UnsupportedVersion(_) | LibRuxError::UnexpectedEndOfInput { .. } => {
                Self::ParsingError(error.to_string())
            }
            LibRuxError::ParsingError(s) => Self::ParsingError(s),
            LibRuxError::ConfigError(s) => Self::ConfigError(s),
            LibRuxError::IoError(s) => Self::OtherError(s),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::OtherError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_version() {
        assert_eq!(parse_target_version("5.00"), Ok(GpVersion::GP5));
        assert_eq!(parse_target_version("5.10"), Ok(GpVersion::GP5_10));
        assert!(parse_target_version("4.06").is_err());
    }

    #[test]
    fn test_cli_args() {
        let args = CliArgs::try_parse_from([
            "ruxtab",
            "song.gp5",
            "--output",
            "out.gp5",
            "--target-version",
            "5.10",
        ])
        .unwrap();
        assert_eq!(args.tab_file_path, "song.gp5");
        assert_eq!(args.output.as_deref(), Some("out.gp5"));
        assert_eq!(args.target_version, Some(GpVersion::GP5_10));
        assert!(!args.json);

        assert!(CliArgs::try_parse_from(["ruxtab", "song.gp5", "--target-version", "6"]).is_err());
    }

    #[test]
    fn test_app_error_from_lib() {
        let err = AppError::from(LibRuxError::UnexpectedEndOfInput { offset: 12 });
        assert_eq!(
            err.to_string(),
            "parsing error: unexpected end of input at offset 12"
        );
    }
}

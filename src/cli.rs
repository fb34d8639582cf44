//! Аргументы командной строки

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "icpc-audio", version)]
#[command(
    about = "ICPC Team Audio Generator - Generate audio files for team/organization names",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate audio files for team or organization names
    ///
    /// FOLDER is the contest package folder containing icpc-audio.yaml and
    /// teams.json and/or organizations.json. Run `icpc-audio configure FOLDER`
    /// first to create the config file.
    Generate {
        /// Contest package folder
        #[arg(value_parser = existing_dir)]
        folder: PathBuf,

        /// Overwrite existing audio files
        #[arg(long)]
        force: bool,

        /// Preview what would be generated
        #[arg(long)]
        dry_run: bool,
    },
    /// Run interactive configuration wizard
    Configure {
        /// Folder where icpc-audio.yaml will be created
        #[arg(value_parser = existing_dir)]
        folder: PathBuf,
    },
    /// List available Google TTS voices
    Voices {
        /// Optional folder to load credentials from icpc-audio.yaml
        #[arg(value_parser = existing_dir)]
        folder: Option<PathBuf>,

        /// Filter by language code (e.g., en-US)
        #[arg(short, long)]
        language: Option<String>,

        /// Path to Google Cloud credentials JSON
        #[arg(short, long, value_parser = existing_file)]
        credentials: Option<PathBuf>,
    },
}

fn existing_dir(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("directory '{}' does not exist", value))
    }
}

fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("file '{}' does not exist", value))
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
    fn test_parse_generate() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["icpc-audio", "generate", folder, "--dry-run"]).unwrap();
        match cli.command {
            Commands::Generate {
                folder: parsed,
                force,
                dry_run,
            } => {
                assert_eq!(parsed, dir.path());
                assert!(!force);
                assert!(dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_missing_folder_is_rejected() {
        let result = Cli::try_parse_from(["icpc-audio", "generate", "/definitely/not/here"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_voices() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = dir.path().join("sa.json");
        std::fs::write(&credentials, "{}").unwrap();

        let cli = Cli::try_parse_from([
            "icpc-audio",
            "voices",
            "-l",
            "sv-SE",
            "--credentials",
            credentials.to_str().unwrap(),
        ])
        .unwrap();
        match cli.command {
            Commands::Voices {
                folder,
                language,
                credentials: parsed,
            } => {
                assert!(folder.is_none());
                assert_eq!(language.as_deref(), Some("sv-SE"));
                assert_eq!(parsed.as_deref(), Some(credentials.as_path()));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let missing = Cli::try_parse_from(["icpc-audio", "voices", "-c", "/nope/sa.json"]);
        assert!(missing.is_err());
    }
}

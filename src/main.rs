use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use icpc_audio::AudioGenerator;
use icpc_audio::cli::{Cli, Commands};
use icpc_audio::config::{
    CREDENTIALS_ENV_VAR, RunConfig, load_config, resolve_credentials,
};
use icpc_audio::configure::{Prompter, run_configure};
use icpc_audio::error::IcpcAudioError;
use icpc_audio::executor::cancel_on_interrupt;
use icpc_audio::report::render_voice_table;
use icpc_audio::tts::SpeechSynthesizer;
use icpc_audio::tts::google::GoogleTtsClient;
use icpc_audio::utils::logger::init_logger;

#[tokio::main]
async fn main() {
    init_logger();

    let cli = Cli::parse();
    // Переменная окружения читается один раз и дальше передается явно
    let env_credentials = std::env::var_os(CREDENTIALS_ENV_VAR);

    if let Err(e) = run(cli, env_credentials).await {
        report_error(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, env_credentials: Option<OsString>) -> Result<()> {
    match cli.command {
        Commands::Generate {
            folder,
            force,
            dry_run,
        } => generate(&folder, force, dry_run, env_credentials).await,
        Commands::Configure { folder } => configure(&folder, env_credentials).await,
        Commands::Voices {
            folder,
            language,
            credentials,
        } => voices(folder, language, credentials, env_credentials).await,
    }
}

async fn generate(
    folder: &Path,
    force: bool,
    dry_run: bool,
    env_credentials: Option<OsString>,
) -> Result<()> {
    let persisted = load_config(folder)?
        .ok_or_else(|| IcpcAudioError::ConfigNotFound(folder.to_path_buf()))?;
    persisted.validate()?;

    let credentials = resolve_credentials(persisted.configured_credentials(), env_credentials)?;
    let config = RunConfig::from_persisted(folder, &persisted, Some(credentials), force, dry_run)?;

    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if cancel_on_interrupt(tokio::signal::ctrl_c, on_interrupt).await {
            eprintln!("\n{}", "Aborted".red());
            std::process::exit(130);
        }
    });

    let generator = AudioGenerator::new(config)
        .with_progress_bar(std::io::stdout().is_terminal())
        .with_cancellation(cancellation);
    let mut stdout = std::io::stdout();
    generator.run(&mut stdout, connect_google).await?;
    Ok(())
}

fn connect_google(config: &RunConfig) -> icpc_audio::error::Result<Arc<dyn SpeechSynthesizer>> {
    let credentials = config
        .credentials
        .as_deref()
        .ok_or(IcpcAudioError::CredentialsMissing)?;
    Ok(Arc::new(GoogleTtsClient::new(credentials)?))
}

async fn configure(folder: &Path, env_credentials: Option<OsString>) -> Result<()> {
    let stdin = std::io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), std::io::stdout());

    let result = run_configure(folder, &mut prompter, env_credentials, |path| {
        Ok(Arc::new(GoogleTtsClient::new(path)?) as Arc<dyn SpeechSynthesizer>)
    })
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(IcpcAudioError::Cancelled) => {
            println!("\n{}", "Configuration cancelled.".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn voices(
    folder: Option<PathBuf>,
    language: Option<String>,
    credentials: Option<PathBuf>,
    env_credentials: Option<OsString>,
) -> Result<()> {
    // Явный путь, затем конфигурация папки, затем переменная окружения
    let configured = match (&credentials, &folder) {
        (Some(path), _) => Some(path.to_string_lossy().into_owned()),
        (None, Some(folder)) => load_config(folder)?.and_then(|c| c.credentials_path),
        (None, None) => None,
    };
    let credentials = resolve_credentials(configured.as_deref(), env_credentials)?;

    let client = GoogleTtsClient::new(&credentials)?;
    let voices = client
        .list_voices(language.as_deref())
        .await
        .context("failed to connect to Google TTS")?;

    println!("{}", render_voice_table(&voices));
    Ok(())
}

fn report_error(error: &anyhow::Error) {
    eprintln!("{}", format!("Error: {:#}", error).red());

    match error.downcast_ref::<IcpcAudioError>() {
        Some(IcpcAudioError::ConfigNotFound(folder)) => {
            eprintln!(
                "Run {} first",
                format!("icpc-audio configure {}", folder.display()).cyan()
            );
        }
        Some(IcpcAudioError::CredentialsMissing) => {
            eprintln!(
                "Set credentials_path in config or {} env var",
                CREDENTIALS_ENV_VAR
            );
        }
        Some(e) if e.is_fatal_precondition() => {}
        _ => log::error!("{:?}", error),
    }
}

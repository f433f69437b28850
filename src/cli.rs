use std::future::Future;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};

use crate::chat::ChatEngine;
use crate::config::{get_config_path, load_config, save_config, CliOverrides, Config};
use crate::conversation::{ConversationManager, SessionStore};
use crate::providers::{OpenAiProvider, RetryPolicy};
use crate::repl;
use crate::voice::{SpeechPipeline, Transcriber};

#[derive(Parser)]
#[command(name = "voxloop")]
#[command(about = "voxloop - voice assistant harness")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to an alternate configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session
    Chat(ChatArgs),
    /// Send a single message and print the reply
    Ask(AskArgs),
    /// Synthesize text to speech and save it as an MP3 file
    Say(SayArgs),
    /// Transcribe an audio file to text
    Transcribe(TranscribeArgs),
    /// Manage API keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Display version information
    Version,
}

#[derive(Args)]
pub struct ChatArgs {
    /// Session id for conversation history
    #[arg(long)]
    pub session: Option<String>,

    /// Do not read or write conversation history
    #[arg(long)]
    pub no_history: bool,

    /// Maximum number of messages kept in the conversation log
    #[arg(long, value_name = "N")]
    pub max_history: Option<usize>,

    /// Chat model to use
    #[arg(long)]
    pub model: Option<String>,

    /// Directory holding session records
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Synthesize every assistant reply to the speech cache
    #[arg(long)]
    pub speak: bool,
}

#[derive(Args)]
pub struct AskArgs {
    /// The message to send
    pub message: String,

    /// Session id for conversation history
    #[arg(long)]
    pub session: Option<String>,

    /// Do not read or write conversation history
    #[arg(long)]
    pub no_history: bool,

    /// Maximum number of messages kept in the conversation log
    #[arg(long, value_name = "N")]
    pub max_history: Option<usize>,

    /// Chat model to use
    #[arg(long)]
    pub model: Option<String>,

    /// Directory holding session records
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct SayArgs {
    /// Text to synthesize
    pub text: String,

    /// Output file (defaults to a generated name in the speech cache)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct TranscribeArgs {
    /// Audio file to transcribe
    pub file: PathBuf,
}

#[derive(Subcommand)]
pub enum KeysAction {
    /// Prompt for API keys and store them in the config file
    Set {
        /// Set the OpenAI API key
        #[arg(long)]
        openai: bool,

        /// Set the ElevenLabs API key
        #[arg(long)]
        elevenlabs: bool,
    },
    /// Report which API keys are configured
    Check,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the configuration with secrets masked
    Show,
}

pub fn run(cli: Cli) {
    let code = match dispatch(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    };
    process::exit(code);
}

fn dispatch(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        // No subcommand: print help and exit successfully
        <Cli as clap::CommandFactory>::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Version => {
            println!("voxloop {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Keys { action } => keys_command(action, cli.config),
        Commands::Config { action } => config_command(action, cli.config),
        Commands::Chat(args) => block_on(chat_command(args, cli.config)),
        Commands::Ask(args) => block_on(ask_command(args, cli.config)),
        Commands::Say(args) => block_on(say_command(args, cli.config)),
        Commands::Transcribe(args) => block_on(transcribe_command(args, cli.config)),
    }
}

fn block_on<F>(future: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(future)
}

fn build_engine(config: &Config) -> Result<ChatEngine> {
    let retry = RetryPolicy::from_settings(&config.rate_limiting);
    let provider = OpenAiProvider::new(&config.openai, retry)?;
    let store = SessionStore::new(config.conversation.history_dir());
    let conversation = ConversationManager::open(
        store,
        config.conversation.session_id.clone(),
        config.conversation.max_history,
        config.conversation.save_history,
    );

    Ok(ChatEngine::new(
        Arc::new(provider),
        conversation,
        &config.system_prompt(),
    ))
}

async fn chat_command(args: ChatArgs, config_path: Option<PathBuf>) -> Result<()> {
    let overrides = CliOverrides {
        model: args.model,
        session: args.session,
        max_history: args.max_history,
        no_history: args.no_history,
        history_dir: args.history_dir,
    };
    let config = load_config(&overrides, config_path)?;

    let speech = if args.speak {
        Some(SpeechPipeline::from_config(&config)?)
    } else {
        None
    };

    let engine = build_engine(&config)?;
    repl::run_chat(engine, speech).await
}

async fn ask_command(args: AskArgs, config_path: Option<PathBuf>) -> Result<()> {
    let overrides = CliOverrides {
        model: args.model,
        session: args.session,
        max_history: args.max_history,
        no_history: args.no_history,
        history_dir: args.history_dir,
    };
    let config = load_config(&overrides, config_path)?;

    let mut engine = build_engine(&config)?;
    let reply = engine.respond(&args.message).await;
    engine.finish();

    println!("{}", reply);
    Ok(())
}

async fn say_command(args: SayArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(&CliOverrides::default(), config_path)?;
    let pipeline = SpeechPipeline::from_config(&config)?;

    let (path, engine) = pipeline
        .synthesize_to_file(&args.text, args.out.as_deref())
        .await?;

    println!("Saved speech to {} ({})", path.display(), engine);
    Ok(())
}

async fn transcribe_command(args: TranscribeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(&CliOverrides::default(), config_path)?;
    let transcriber = Transcriber::new(&config.openai, &config.stt)?;

    let text = transcriber.transcribe_file(&args.file).await?;
    println!("{}", text);
    Ok(())
}

fn keys_command(action: KeysAction, config_path: Option<PathBuf>) -> Result<()> {
    match action {
        KeysAction::Set { openai, elevenlabs } => set_keys(openai, elevenlabs, config_path),
        KeysAction::Check => check_keys(config_path),
    }
}

fn set_keys(openai: bool, elevenlabs: bool, config_path: Option<PathBuf>) -> Result<()> {
    // No selector flag means set both
    let (set_openai, set_elevenlabs) = if !openai && !elevenlabs {
        (true, true)
    } else {
        (openai, elevenlabs)
    };

    let mut config = load_config(&CliOverrides::default(), config_path.clone())?;

    if set_openai {
        let key = prompt_key("Enter your OpenAI API key (or press Enter to skip):")?;
        if !key.is_empty() {
            if !key.starts_with("sk-") {
                eprintln!("warning: OpenAI API keys usually start with 'sk-'");
            }
            config.openai.api_key = Some(key);
        }
    }

    if set_elevenlabs {
        let key = prompt_key("Enter your ElevenLabs API key (or press Enter to skip):")?;
        if !key.is_empty() {
            config.tts.elevenlabs_api_key = Some(key);
        }
    }

    let path = config_path
        .or_else(get_config_path)
        .context("could not determine the config file path")?;
    save_config(&config, &path)?;

    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn prompt_key(message: &str) -> Result<String> {
    let key = Password::new(message)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Press Enter without typing to skip this step")
        .prompt()?;

    Ok(key.trim().to_string())
}

fn check_keys(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(&CliOverrides::default(), config_path)?;
    let summary = config.safe_summary();

    println!(
        "OpenAI API key:     {}",
        summary.openai_key.as_deref().unwrap_or("not configured")
    );
    println!(
        "ElevenLabs API key: {}",
        summary.elevenlabs_key.as_deref().unwrap_or("not configured")
    );
    Ok(())
}

fn config_command(action: ConfigAction, config_path: Option<PathBuf>) -> Result<()> {
    match action {
        ConfigAction::Show => show_config(config_path),
    }
}

fn show_config(config_path: Option<PathBuf>) -> Result<()> {
    let path = config_path.clone().or_else(get_config_path);
    let config = load_config(&CliOverrides::default(), config_path)?;
    let summary = config.safe_summary();

    match path {
        Some(p) => println!("Config file:        {}", p.display()),
        None => println!("Config file:        (none)"),
    }
    println!("Assistant name:     {}", config.assistant_name);
    println!("Model:              {}", summary.model);
    println!("Session:            {}", summary.session_id);
    println!("Max history:        {}", summary.max_history);
    println!("Save history:       {}", summary.save_history);
    println!(
        "OpenAI API key:     {}",
        summary.openai_key.as_deref().unwrap_or("not configured")
    );
    println!(
        "ElevenLabs API key: {}",
        summary.elevenlabs_key.as_deref().unwrap_or("not configured")
    );
    Ok(())
}

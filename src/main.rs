use clap::{
    ArgAction, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use discover_sync::{cli, config, error, types::ExtractMode, warning};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize an account with the Spotify API
    Auth(AuthOptions),

    /// Copy this week's playlists to the destination service
    Sync(SyncOptions),

    /// Extract playlists into the local track cache
    Extract(ExtractOptions),

    /// Show configured accounts and the current sync period
    Info(InfoOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Account index, required when several accounts are configured
    #[clap(long)]
    account: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct SyncOptions {
    /// Only sync these accounts; can be repeated
    #[clap(long, action = ArgAction::Append, num_args = 1)]
    account: Vec<String>,

    /// Only sync playlists with these logical names; can be repeated
    #[clap(long, action = ArgAction::Append, num_args = 1)]
    playlist: Vec<String>,

    /// How tracks are read from Spotify (api, scrape, cache)
    #[clap(long)]
    mode: Option<ExtractMode>,

    /// Date inside the week to sync (YYYY-MM-DD)
    #[clap(long)]
    date: Option<String>,

    /// Number of playlists synced at the same time
    #[clap(long)]
    concurrency: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractOptions {
    /// Account index
    #[clap(long)]
    account: String,

    /// Only extract playlists with these logical names; can be repeated
    #[clap(long, action = ArgAction::Append, num_args = 1)]
    playlist: Vec<String>,

    /// How tracks are read from Spotify (api, scrape)
    #[clap(long)]
    mode: Option<ExtractMode>,
}

#[derive(Parser, Debug, Clone)]
pub struct InfoOptions {
    /// Date inside the week to show (YYYY-MM-DD)
    #[clap(long)]
    date: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        warning!("Cannot load environment file. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command_for_update();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("{}", e),
    };

    let ok = match cli.command {
        Command::Auth(opt) => {
            cli::auth(&config, opt.account).await;
            true
        }
        Command::Sync(opt) => {
            let args = cli::SyncArgs {
                accounts: opt.account,
                playlists: opt.playlist,
                mode: opt.mode,
                date: opt.date,
                concurrency: opt.concurrency,
            };
            cli::sync(&config, args).await
        }
        Command::Extract(opt) => cli::extract(&config, opt.account, opt.playlist, opt.mode).await,
        Command::Info(opt) => {
            cli::info(&config, opt.date).await;
            true
        }
        Command::Completions(_) => true,
    };

    if !ok {
        std::process::exit(1);
    }
}

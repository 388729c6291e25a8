use chatbridge_core::{
    config::Config,
    http_client::HttpClient,
    relay::{Relay, RelayMessage, channel},
    token::TokenCache,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "chatbridge CLI smoke tool", long_about = None)]
struct Cli {
    /// Config file (JSON or TOML); built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a question over a relay channel and print the streamed answer
    Ask {
        #[arg(short, long, help = "Question to submit")]
        message: String,
    },
    /// Probe the identity endpoint through the credential cache
    Session,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Ask { message } => {
            let relay = Relay::from_config(&cfg)?;
            let (mut ui, port) = channel(32);
            let serve = tokio::spawn(async move { relay.serve(port).await });

            if !ui.submit(message).await {
                anyhow::bail!("relay refused the question");
            }

            use std::io::{self, Write};
            let mut saw_text = false;
            while let Some(msg) = ui.recv().await {
                match msg {
                    RelayMessage::AnswerText { answer } => {
                        saw_text = true;
                        print!("{}", answer);
                        io::stdout().flush().ok();
                    }
                    RelayMessage::AnswerDone => {
                        if saw_text {
                            println!();
                        }
                        break;
                    }
                    RelayMessage::AnswerError { error } => {
                        if saw_text {
                            println!();
                        }
                        anyhow::bail!("exchange failed: {error}");
                    }
                }
            }
            serve.await?;
        }
        Commands::Session => {
            let http = HttpClient::new(&cfg.http)?;
            let tokens = TokenCache::from_config(http, &cfg);
            match tokens.get().await {
                Ok(_) => println!(
                    "session credential obtained (cached for {}s)",
                    cfg.token.ttl_seconds
                ),
                Err(e) => anyhow::bail!("no session credential: {e}"),
            }
        }
    }

    Ok(())
}

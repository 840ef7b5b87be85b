use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::io::{self, Write};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

mod client;

use client::{Identity, WebhookClient};

#[derive(Parser)]
#[command(name = "webhook-client")]
#[command(about = "Sends signed Zalo OA webhooks to the chatbot simulator")]
struct Cli {
    /// Webhook endpoint of the simulator
    #[arg(long, env, default_value = "http://localhost:3001/webhook")]
    webhook_url: String,

    /// Zalo OA application ID placed in every payload
    #[arg(long, env, default_value = "demo_app_id")]
    app_id: String,

    /// Simulated Zalo user sending the messages
    #[arg(long, env, default_value = "demo_user_123")]
    user_id: String,

    /// Official Account receiving the messages
    #[arg(long, env, default_value = "demo_oa_987")]
    oa_id: String,

    /// OA secret key used to sign requests
    #[arg(
        long,
        env,
        hide_env_values = true,
        default_value = "demo_secret_key_change_in_production"
    )]
    secret_key: String,

    /// Seconds to wait for the server's reply
    #[arg(long, env, default_value_t = 30)]
    request_timeout_secs: u64,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message and print the bot's reply
    Send {
        /// Message text
        text: String,
    },
    /// Chat interactively, one message per line
    Chat,
    /// Check that the server is up
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    let client = WebhookClient::new(
        cli.webhook_url.clone(),
        Identity {
            app_id: cli.app_id,
            user_id: cli.user_id,
            oa_id: cli.oa_id,
            secret_key: cli.secret_key,
        },
        Duration::from_secs(cli.request_timeout_secs),
    )
    .context("Failed to build HTTP client")?;

    match cli.command {
        Command::Send { text } => {
            let envelope = client.send(&text).await?;
            println!("{} {}", "Bot:".green().bold(), envelope.data.message.text);
        }
        Command::Chat => chat(&client, BufReader::new(tokio::io::stdin())).await?,
        Command::Health => {
            if client.health().await {
                println!("{} Server is healthy", "✓".green());
            } else {
                println!("{} Server is not reachable", "✗".red());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Send each input line as a message until an empty line or end of input.
async fn chat<R>(client: &WebhookClient, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!(
        "{} Chatting with {} (empty line or Ctrl+D to quit)",
        "→".blue(),
        client.webhook_url()
    );

    let mut lines = input.lines();
    loop {
        print!("{} ", "You:".cyan().bold());
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            break;
        }

        match client.send(&line).await {
            Ok(envelope) => println!("{} {}", "Bot:".green().bold(), envelope.data.message.text),
            Err(e) => println!("{} {}", "✗".red(), e),
        }
    }

    Ok(())
}

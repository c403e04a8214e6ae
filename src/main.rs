//! Kaiwa CLI binary entry point.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use kaiwa::cli::{Cli, Commands, SummaryArgs, TalkArgs};
use kaiwa::config::KaiwaConfig;
use kaiwa::conversation::{Conversation, ConversationEvent, ConversationOptions};
use kaiwa::credential::StaticCredential;
use kaiwa::error::{Disposition, Result};
use kaiwa::persistence::{ChatId, HttpChatApi};
use kaiwa::session::SessionInitiator;
use kaiwa::transport::WebSocketConnector;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.load_config() {
        Ok(config) => match &cli.command {
            Commands::Talk(args) => handle_talk(config, args).await,
            Commands::Summary(args) => handle_summary(config, args).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        match e.disposition() {
            Disposition::Notify => eprintln!("Error: {e}"),
            Disposition::LogOnly => tracing::error!(error = %e, "kaiwa failed"),
        }
        std::process::exit(1);
    }
}

async fn handle_talk(config: KaiwaConfig, args: &TalkArgs) -> Result<()> {
    let config = args.apply(config);
    let chat_api = Arc::new(HttpChatApi::new(&config)?);
    let chat_id = chat_api.create_chat(config.speech.mode).await?;

    let initiator = SessionInitiator::new(
        Arc::new(StaticCredential::from_config(&config)?),
        Arc::new(WebSocketConnector::from_config(&config)),
        &config,
    );
    let channel = initiator.start().await?;
    let options = ConversationOptions {
        time_limit: args.time_limit(),
    };
    let mut conversation = Conversation::start(channel, chat_id, chat_api.clone(), options);

    eprintln!(
        "chat {chat_id} ({}, {}). Type a message, /quit to finish.",
        config.speech.mode, config.speech.level
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim() == "/quit" => break,
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => conversation.send_text(line).await?,
                    None => break,
                }
            }
            event = conversation.next_event() => {
                match event {
                    Some(ConversationEvent::Closed) | None => break,
                    Some(event) => render(event),
                }
            }
        }
    }

    let elapsed = conversation.clock().display();
    conversation.close().await?;
    eprintln!("session length {elapsed}");

    match chat_api.request_summary(chat_id).await {
        Ok(summary) => println!("\n{summary}"),
        Err(e) => tracing::warn!(error = %e, %chat_id, "summary unavailable"),
    }
    Ok(())
}

async fn handle_summary(config: KaiwaConfig, args: &SummaryArgs) -> Result<()> {
    let chat_api = HttpChatApi::new(&config)?;
    let summary = chat_api.request_summary(ChatId(args.chat_id)).await?;
    println!("{summary}");
    Ok(())
}

fn render(event: ConversationEvent) {
    match event {
        ConversationEvent::AssistantDelta { text } => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        ConversationEvent::AssistantTurn { .. } => println!(),
        ConversationEvent::MessageSaved {
            reading, english, ..
        } => {
            if let Some(reading) = reading {
                println!("  ({reading})");
            }
            if let Some(english) = english {
                println!("  {english}");
            }
        }
        ConversationEvent::ServiceError { message } => eprintln!("! {message}"),
        ConversationEvent::TimeLimitReached { .. } => eprintln!("time is up"),
        _ => {}
    }
}

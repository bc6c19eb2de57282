use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use seekchat::api::ChatRequest;
use seekchat::core::chat_stream::{send_once, ChatStreamService, StreamMessage, StreamParams};
use seekchat::core::config::Config;
use seekchat::core::render::RenderDriver;
use seekchat::logging::{init_tracing, TranscriptLog};
use seekchat::ui::markdown;
use seekchat::ui::surface::TerminalSurface;

#[derive(Parser)]
#[command(name = "seekchat")]
#[command(about = "A terminal chat client for search-augmented AI backends")]
#[command(long_about = "Seekchat sends your query to a chat backend, optionally with \
web-search augmentation, and renders the reply in the terminal as it streams in.\n\n\
Type a message and press Enter to send it. One request is in flight at a time; the \
prompt returns when the reply finishes. Press Ctrl+C during a reply to cancel it, \
or enter /quit to exit.")]
struct Args {
    /// Backend base URL
    #[arg(long, default_value = "http://localhost:5000")]
    base_url: String,

    /// Model identifier; defaults to the configured model
    #[arg(short, long)]
    model: Option<String>,

    /// Augment queries with web search
    #[arg(short, long)]
    search: bool,

    /// Search engine identifier; defaults to the configured engine
    #[arg(short, long)]
    engine: Option<String>,

    /// Request the reply as one payload instead of a stream
    #[arg(long)]
    no_stream: bool,

    /// Append finished turns to this transcript file
    #[arg(long)]
    log: Option<PathBuf>,
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

async fn run_turn(
    client: &reqwest::Client,
    args: &Args,
    config: &Config,
    query: &str,
    stream_id: u64,
    transcript: &TranscriptLog,
) {
    let request = if args.search {
        ChatRequest::chat_with_search(query, config, !args.no_stream)
    } else {
        ChatRequest::chat(query, config, !args.no_stream)
    };

    let mut surface = TerminalSurface::new();
    let mut driver = RenderDriver::new(&mut surface);

    if request.stream {
        let (service, mut rx) = ChatStreamService::new();
        let cancel_token = CancellationToken::new();
        service.spawn(StreamParams {
            client: client.clone(),
            base_url: args.base_url.clone(),
            request,
            cancel_token: cancel_token.clone(),
            stream_id,
        });

        loop {
            tokio::select! {
                received = rx.recv() => {
                    let Some((message, id)) = received else { break };
                    if id != stream_id {
                        continue;
                    }
                    match message {
                        StreamMessage::Payload(payload) => driver.apply(payload),
                        StreamMessage::Error(text) => driver.fail(&text),
                        StreamMessage::End => break,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    cancel_token.cancel();
                    driver.cancel();
                    break;
                }
            }
        }
    } else {
        match send_once(client, &args.base_url, &request).await {
            Ok(body) => driver.apply_response(body),
            Err(text) => driver.fail(&text),
        }
    }

    if transcript.is_active() {
        let answer = markdown::plain_text(&markdown::render(driver.state().main_text()));
        let entry = format!("you: {query}\nassistant: {answer}");
        if let Err(err) = transcript.log_message(&entry) {
            warn!("failed to write transcript: {err}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let args = Args::parse();

    let mut config = Config::load().unwrap_or_else(|err| {
        warn!("{err}; using default settings");
        Config::default()
    });
    if let Some(model) = &args.model {
        config.default_model = model.clone();
    }
    if let Some(engine) = &args.engine {
        config.default_search_engine = engine.clone();
    }

    let transcript = TranscriptLog::new(args.log.clone());
    let client = reqwest::Client::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stream_id: u64 = 0;

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if query == "/quit" {
            break;
        }
        // Empty input issues no request at all.
        if !query.is_empty() {
            stream_id += 1;
            run_turn(&client, &args, &config, query, stream_id, &transcript).await;
        }
        prompt()?;
    }

    Ok(())
}

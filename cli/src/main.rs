use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use birdwire::{Client, ClientConfig, ClientError, Credentials, ErrorCode, Params, Request, Upload};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Client(#[from] ClientError),
    #[error("invalid parameter `{0}`; expected name=value")]
    InvalidParam(String),
    #[error("incomplete credentials; missing {0}")]
    MissingCredential(&'static str),
    #[error("failed to read {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "birdwire", about = "Signed API calls and streaming from the command line")]
struct Cli {
    #[arg(long, env = "BIRDWIRE_CONSUMER_KEY")]
    consumer_key: Option<String>,

    #[arg(long, env = "BIRDWIRE_CONSUMER_SECRET", hide_env_values = true)]
    consumer_secret: Option<String>,

    #[arg(long, env = "BIRDWIRE_ACCESS_TOKEN")]
    access_token: Option<String>,

    #[arg(long, env = "BIRDWIRE_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    access_token_secret: Option<String>,

    #[arg(long, env = "BIRDWIRE_USER_AGENT", default_value = birdwire::config::DEFAULT_USER_AGENT)]
    user_agent: String,

    #[arg(long, env = "BIRDWIRE_TIMEOUT_SECS", default_value_t = birdwire::config::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[arg(long, env = "BIRDWIRE_CONNECT_TIMEOUT_SECS", default_value_t = birdwire::config::DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    #[arg(long, env = "BIRDWIRE_STREAM_CHUNK_SIZE", default_value_t = birdwire::config::DEFAULT_STREAM_CHUNK_SIZE)]
    chunk_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Signed GET; parameters go in the query string.
    Get(CallArgs),
    /// Signed form POST, or multipart when `--file` is given.
    Post(PostArgs),
    /// Open a stream and print one message per line until interrupted.
    Stream(StreamArgs),
}

#[derive(Args, Debug)]
struct CallArgs {
    url: String,

    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    #[arg(long, default_value_t = false, help = "Pretty-print a JSON body")]
    pretty: bool,

    #[arg(long, default_value_t = false, help = "Print response headers to stderr")]
    headers: bool,
}

#[derive(Args, Debug)]
struct PostArgs {
    #[command(flatten)]
    call: CallArgs,

    #[arg(long, help = "Send this file as the binary part of a multipart body")]
    file: Option<PathBuf>,

    #[arg(long, default_value = "media")]
    field_name: String,

    #[arg(long, default_value = "application/octet-stream")]
    content_type: String,
}

#[derive(Args, Debug)]
struct StreamArgs {
    url: String,

    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    #[arg(long, help = "Stop after this many non-blank messages")]
    max_messages: Option<usize>,

    #[arg(long, default_value_t = false, help = "Also print blank keep-alive lines")]
    keep_alive: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = ClientConfig {
        user_agent: cli.user_agent.clone(),
        timeout_secs: cli.timeout_secs,
        connect_timeout_secs: cli.connect_timeout_secs,
        stream_chunk_size: cli.chunk_size,
    };
    let client = Arc::new(Client::new(&config, credentials(&cli)?)?);

    let outcome = match cli.command {
        Command::Get(args) => run_get(&client, args).await,
        Command::Post(args) => run_post(&client, args).await,
        Command::Stream(args) => run_stream(client, args).await,
    };
    if let Err(CliError::Client(e)) = &outcome {
        eprintln!("{} (retryable: {})", e.error_code(), e.retryable());
    }
    outcome
}

/// All four credential values, or none of them.
fn credentials(cli: &Cli) -> Result<Option<Credentials>, CliError> {
    let fields = [
        ("BIRDWIRE_CONSUMER_KEY", &cli.consumer_key),
        ("BIRDWIRE_CONSUMER_SECRET", &cli.consumer_secret),
        ("BIRDWIRE_ACCESS_TOKEN", &cli.access_token),
        ("BIRDWIRE_ACCESS_TOKEN_SECRET", &cli.access_token_secret),
    ];
    if fields.iter().all(|(_, value)| value.is_none()) {
        return Ok(None);
    }
    if let Some((name, _)) = fields.iter().find(|(_, value)| value.is_none()) {
        return Err(CliError::MissingCredential(*name));
    }
    let [ck, cs, at, ats] = fields.map(|(_, value)| value.clone().unwrap_or_default());
    Ok(Some(Credentials::new(ck, cs, at, ats)))
}

async fn run_get(client: &Client, args: CallArgs) -> Result<(), CliError> {
    let request = Request::get(&args.url).params(parse_params(&args.params)?);
    let response = client.execute(&request).await?;
    if args.headers {
        print_headers(&response.url, &response.headers);
    }
    print_body(&response.body, args.pretty)
}

async fn run_post(client: &Client, args: PostArgs) -> Result<(), CliError> {
    let params = parse_params(&args.call.params)?;
    let response = match &args.file {
        Some(path) => {
            let data = std::fs::read(path).map_err(|source| CliError::ReadFile { path: path.clone(), source })?;
            let file_name = path
                .file_name()
                .map_or_else(|| "upload".to_owned(), |name| name.to_string_lossy().into_owned());
            let upload = Upload::new(data, args.field_name.clone(), file_name, args.content_type.clone());
            client.post_multipart(&args.call.url, &params, &upload).await?
        }
        None => client.execute(&Request::post(&args.call.url).params(params)).await?,
    };
    if args.call.headers {
        print_headers(&response.url, &response.headers);
    }
    print_body(&response.body, args.call.pretty)
}

async fn run_stream(client: Arc<Client>, args: StreamArgs) -> Result<(), CliError> {
    let params = parse_params(&args.params)?;

    let interrupt = {
        let client = client.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("interrupted; closing stream");
                client.request_stop();
            }
        })
    };

    let delivered = AtomicUsize::new(0);
    let on_message = |line: &str| {
        if line.is_empty() && !args.keep_alive {
            return;
        }
        println!("{line}");
        if line.is_empty() {
            return;
        }
        let count = delivered.fetch_add(1, Ordering::Relaxed) + 1;
        if args.max_messages.is_some_and(|max| count >= max) {
            client.request_stop();
        }
    };

    let outcome = client.stream(&args.url, &params, on_message).await;
    interrupt.abort();
    outcome?;
    eprintln!("stream closed after {} messages", delivered.load(Ordering::Relaxed));
    Ok(())
}

fn parse_params(raw: &[String]) -> Result<Params, CliError> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, value)| (name.to_owned(), value.to_owned()))
                .ok_or_else(|| CliError::InvalidParam(entry.clone()))
        })
        .collect()
}

fn print_headers(url: &str, headers: &[(String, String)]) {
    eprintln!("{url}");
    for (name, value) in headers {
        eprintln!("{name}: {value}");
    }
}

fn print_body(body: &str, pretty: bool) -> Result<(), CliError> {
    if !pretty {
        println!("{body}");
        return Ok(());
    }
    let value = serde_json::from_str::<Value>(body)?;
    let rendered = serde_json::to_string_pretty(&value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

use clap::{Parser, Subcommand};
use reqwest::header::CONTENT_TYPE;
use std::path::PathBuf;

use terminal_gateway::http::request::decode_body;
use terminal_gateway::xml::writer::request_payload;

#[derive(Parser)]
#[command(name = "terminal-cli")]
#[command(about = "Send Field/Value payloads to the terminal gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post a payload to an endpoint and print the decoded reply
    Send {
        /// Endpoint path, e.g. /consultar-cep
        #[arg(short, long)]
        endpoint: String,

        /// Raw XML file to send as-is
        #[arg(short, long, conflicts_with = "field")]
        file: Option<PathBuf>,

        /// Field to include, as ID=VALUE (repeatable)
        #[arg(long = "field", value_parser = parse_field)]
        field: Vec<(String, String)>,

        /// Scale selector for the per-scale weight endpoints
        #[arg(short, long)]
        balanca: Option<String>,
    },
    /// Check gateway liveness
    Health,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(id, value)| (id.trim().to_string(), value.to_string()))
        .filter(|(id, _)| !id.is_empty())
        .ok_or_else(|| format!("expected ID=VALUE, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Send {
            endpoint,
            file,
            field,
            balanca,
        } => {
            let payload = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => request_payload(field.iter().map(|(id, v)| (id.as_str(), v.as_str())))?,
            };

            let mut request = client
                .post(format!("{}/{}", base, endpoint.trim_start_matches('/')))
                .header(CONTENT_TYPE, "application/xml; charset=utf-8")
                .body(payload);
            if let Some(balanca) = balanca {
                request = request.query(&[("balanca", balanca)]);
            }

            let res = request.send().await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            println!("{} {}", res.status(), res.text().await?);
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let bytes = res.bytes().await?;

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }

    // Bodies are UTF-16LE whatever the advertised charset.
    let text = if bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]) {
        decode_body(&bytes, false)
    } else if bytes.len() >= 2 && bytes[1] == 0 {
        let mut with_bom = vec![0xFF, 0xFE];
        with_bom.extend_from_slice(&bytes);
        decode_body(&with_bom, false)
    } else {
        decode_body(&bytes, true)
    };

    match text {
        Some(text) => println!("{}", text),
        None => eprintln!("Could not decode {} byte response ({})", bytes.len(), content_type),
    }
    Ok(())
}

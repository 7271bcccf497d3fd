use std::collections::HashSet;

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use reqwest::header::{HeaderName, HeaderValue};

#[derive(Parser)]
#[command(name = "corr-probe")]
#[command(about = "Debug client for checking correlation headers of a running service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Correlation header the service is configured with.
    #[arg(long, default_value = "x-request-id")]
    header: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request and print the correlation header, status and body
    Send {
        #[arg(short, long, default_value = "/v1/context")]
        path: String,

        /// Correlation id to supply; omitted means the service generates one
        #[arg(long)]
        id: Option<String>,
    },
    /// Send concurrent requests and check every id is unique (or passed through)
    Burst {
        #[arg(short, long, default_value = "/health")]
        path: String,

        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,

        /// Supply this id on every request and expect it echoed back
        #[arg(long)]
        id: Option<String>,
    },
}

struct Probe {
    client: reqwest::Client,
    url: String,
    header: HeaderName,
}

impl Probe {
    async fn send(&self, path: &str, id: Option<&str>) -> Result<(u16, Option<String>, String), Box<dyn std::error::Error>> {
        let mut request = self.client.get(format!("{}{}", self.url, path));
        if let Some(id) = id {
            request = request.header(self.header.clone(), HeaderValue::from_str(id)?);
        }

        let res = request.send().await?;
        let status = res.status().as_u16();
        let echoed = res
            .headers()
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = res.text().await?;
        Ok((status, echoed, body))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let probe = Probe {
        client: reqwest::Client::new(),
        url: cli.url.trim_end_matches('/').to_string(),
        header: HeaderName::from_bytes(cli.header.as_bytes())?,
    };

    match cli.command {
        Commands::Send { path, id } => {
            let (status, echoed, body) = probe.send(&path, id.as_deref()).await?;
            println!("status: {}", status);
            println!("{}: {}", probe.header, echoed.as_deref().unwrap_or("<missing>"));
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                Err(_) => println!("{}", body),
            }
        }
        Commands::Burst { path, count, id } => {
            let results = join_all((0..count).map(|_| probe.send(&path, id.as_deref()))).await;

            let mut seen = HashSet::new();
            let mut missing = 0;
            let mut failed = 0;
            let mut mismatched = 0;
            for result in results {
                match result {
                    Ok((_, Some(echoed), _)) => {
                        if id.as_deref().is_some_and(|id| id != echoed) {
                            mismatched += 1;
                        }
                        seen.insert(echoed);
                    }
                    Ok((_, None, _)) => missing += 1,
                    Err(e) => {
                        eprintln!("request failed: {}", e);
                        failed += 1;
                    }
                }
            }

            println!("requests:   {}", count);
            println!("failed:     {}", failed);
            println!("no header:  {}", missing);
            println!("unique ids: {}", seen.len());
            if id.is_some() {
                println!("mismatched: {}", mismatched);
            }

            let ok = failed == 0
                && missing == 0
                && match id {
                    Some(_) => mismatched == 0 && seen.len() == 1,
                    None => seen.len() == count,
                };
            if !ok {
                eprintln!("Error: correlation check failed");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

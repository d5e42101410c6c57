use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the WebSocket gateway", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key
    #[arg(short, long, env = "GATEWAY_ADMIN_KEY", default_value = "")]
    key: String,

    /// Gateway base URL, used by `send`
    #[arg(short, long, default_value = "http://localhost:4000")]
    gateway: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List live connections
    Connections,
    /// Close the connection bound to an address
    Disconnect { address: String },
    /// Push a message into the socket bound to an address
    Send { address: String, message: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Connections => {
            let res = client.get(format!("{}/admin/connections", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Disconnect { address } => {
            let res = client.delete(format!("{}/admin/connections/{}", cli.url, address))
                .headers(headers)
                .send()
                .await?;
            match res.status().as_u16() {
                204 => println!("Closed connection for '{}'", address),
                404 => eprintln!("No connection for '{}'", address),
                status => eprintln!("Error: Admin API returned status {}", status),
            }
        }
        Commands::Send { address, message } => {
            let res = client.post(format!("{}/{}", cli.gateway.trim_end_matches('/'), address))
                .body(message)
                .send()
                .await?;
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            if status.is_success() {
                println!("{}", text);
            } else {
                eprintln!("Error: gateway returned status {}: {}", status, text);
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

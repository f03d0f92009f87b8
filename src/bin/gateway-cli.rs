use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command-line client for the RAG gateway", long_about = None)]
struct Cli {
    #[arg(short, long, env = "GATEWAY_URL", default_value = "http://localhost:8082")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the RAG backend a question
    Ask {
        /// The question text
        question: String,
    },
    /// Clear the backend's document store
    Reset,
    /// Upload a document for ingestion
    Upload {
        /// Path of the file to upload
        path: PathBuf,
        /// Content type sent with the file part
        #[arg(long, default_value = "application/pdf")]
        content_type: String,
    },
    /// Check that the gateway is up
    Info,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Ask { question } => {
            client
                .post(format!("{}/api/answer", base))
                .json(&serde_json::json!({ "question": question }))
                .send()
                .await?
        }
        Commands::Reset => client.post(format!("{}/api/reset", base)).send().await?,
        Commands::Upload { path, content_type } => {
            let data = tokio::fs::read(&path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.pdf".to_string());
            let part = Part::bytes(data)
                .file_name(file_name)
                .mime_str(&content_type)?;
            client
                .post(format!("{}/api/document", base))
                .multipart(Form::new().part("file", part))
                .send()
                .await?
        }
        Commands::Info => client.get(format!("{}/api/", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("Response: {}", text);
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}

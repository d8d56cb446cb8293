use anyhow::Result;
use clap::Parser;
use querybridge::observability::init_tracing;
use querybridge::{Config, QueryService};
use std::io::{self, BufRead, Write};
use tracing::{error, info};

const EXIT_WORDS: [&str; 3] = ["exit", "bye", "quit"];

#[derive(Parser)]
#[command(name = "querybridge")]
#[command(about = "Ask questions about the warehouse in plain language")]
struct Args {
    /// Question to answer once; starts an interactive session when omitted
    question: Option<String>,

    /// Attempt budget (defaults to MAX_ATTEMPTS or 5)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(max_attempts) = args.max_attempts {
        config.max_attempts = max_attempts;
    }

    let service = QueryService::from_config(&config)?;

    match args.question {
        Some(question) => {
            if !answer(&service, &question).await {
                std::process::exit(1);
            }
        }
        None => interactive(&service).await?,
    }

    Ok(())
}

async fn interactive(service: &QueryService) -> Result<()> {
    let stdin = io::stdin();
    loop {
        print!("Enter your query (or type 'exit' to stop): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            println!("Goodbye!");
            break;
        }
        answer(service, question).await;
    }
    Ok(())
}

/// Answer one question and print the rows. Returns false on failure.
async fn answer(service: &QueryService, question: &str) -> bool {
    match service.answer(Some(question)).await {
        Ok(resolution) => {
            info!("SQL after {} attempt(s): {}", resolution.attempts, resolution.sql);
            match serde_json::to_string_pretty(&resolution.result.records()) {
                Ok(rows) => println!("{}", rows),
                Err(e) => error!("Failed to render rows: {}", e),
            }
            true
        }
        Err(e) => {
            println!("Error processing query: {}", e);
            false
        }
    }
}

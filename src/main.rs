use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use fleetbook::config::Config;
use fleetbook::engine::{Engine, EngineError};
use fleetbook::ledger;
use fleetbook::model::{Customer, DateSpan, Reservation};

const USAGE: &str = "usage: fleetbook <submit|ledger|availability START END>";

/// One booking request per stdin line.
#[derive(Debug, Deserialize)]
struct SubmitLine {
    category: String,
    start_date: String,
    end_date: String,
    #[serde(flatten)]
    customer: Customer,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome {
    Committed { reservation: Reservation },
    Rejected { reason: &'static str, message: String, retryable: bool },
}

impl From<Result<Reservation, EngineError>> for Outcome {
    fn from(result: Result<Reservation, EngineError>) -> Self {
        match result {
            Ok(reservation) => Outcome::Committed { reservation },
            Err(e) => Outcome::Rejected {
                reason: e.label(),
                message: e.to_string(),
                retryable: e.is_retryable(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    fleetbook::observability::init(config.metrics_port)?;

    let engine = Engine::open(&config)?;
    info!("fleetbook ready");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  policy: {}", config.policy.as_str());
    info!("  lock_timeout: {:?}", config.lock_timeout);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("submit") => run_submit(&engine).await?,
        Some("ledger") => {
            let reservations = engine.ledger().await?;
            let mut out = std::io::stdout().lock();
            ledger::write_tsv(&mut out, &reservations)?;
        }
        Some("availability") if args.len() == 3 => {
            let start = chrono::NaiveDate::parse_from_str(&args[1], "%Y-%m-%d")?;
            let end = chrono::NaiveDate::parse_from_str(&args[2], "%Y-%m-%d")?;
            let span = DateSpan::new(start, end)
                .ok_or_else(|| format!("end {end} is before start {start}"))?;
            for (category, free) in engine.availability(span).await? {
                println!("{category}\t{free}");
            }
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
    Ok(())
}

async fn run_submit(engine: &Engine) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let outcome = match serde_json::from_str::<SubmitLine>(&line) {
            Ok(req) => Outcome::from(
                engine
                    .submit_raw(&req.category, &req.start_date, &req.end_date, req.customer)
                    .await,
            ),
            Err(e) => Outcome::Rejected {
                reason: "malformed_request",
                message: e.to_string(),
                retryable: false,
            },
        };
        let mut json = serde_json::to_vec(&outcome)?;
        json.push(b'\n');
        stdout.write_all(&json).await?;
    }
    stdout.flush().await?;
    Ok(())
}

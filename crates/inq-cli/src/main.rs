// Inquisitor CLI - ask the security assistant from a terminal

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{Table, presets::UTF8_FULL};
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::{self, Write};

mod render;

use render::{count_rows, event_rows, is_alarming, severity_rows, threat_rows};

const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Parser)]
#[command(name = "inq")]
#[command(version = "0.1.0")]
#[command(about = "Inquisitor security assistant CLI", long_about = None)]
struct Cli {
    /// API server URL
    #[arg(short, long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// API key for authentication (or set INQ_API_KEY env var)
    #[arg(short = 'k', long, env = "INQ_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a security question in plain English
    Ask {
        /// e.g. "show failed logins last 24 hours"
        question: String,
    },

    /// Threat statistics from the database (and SIEM when available)
    Stats {
        /// Lookback window in hours
        #[arg(long, default_value = "24")]
        hours: u32,
    },

    /// List recorded threats, newest first
    Threats {
        /// Only this status (Active, Investigating, Blocked, Resolved)
        #[arg(long)]
        status: Option<String>,

        /// Only this severity (Critical, High, Medium, Low)
        #[arg(long)]
        severity: Option<String>,

        /// Lookback window in hours
        #[arg(long, default_value = "24")]
        hours: u32,

        /// Maximum rows to show
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Pull recent SIEM threats into the database
    Sync {
        /// Lookback window in hours
        #[arg(long, default_value = "1")]
        hours: u32,
    },

    /// Check API and SIEM status
    Status,
}

// API Response types
#[derive(Deserialize)]
struct ChatResponse {
    intent: String,
    timeframe: String,
    response: Value,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
    siem: String,
}

#[derive(Deserialize)]
struct ThreatsResponse {
    count: usize,
    threats: Value,
}

#[derive(Deserialize)]
struct SyncResponse {
    message: String,
    processed: usize,
    inserted: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Build client with optional API key header
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(ref key) = cli.api_key {
        headers.insert("X-API-Key", reqwest::header::HeaderValue::from_str(key)?);
    }
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;

    match cli.command {
        Commands::Ask { question } => {
            ask(&client, &cli.api_url, &question).await?;
        }
        Commands::Stats { hours } => {
            show_stats(&client, &cli.api_url, hours).await?;
        }
        Commands::Threats { status, severity, hours, limit } => {
            list_threats(&client, &cli.api_url, status, severity, hours, limit).await?;
        }
        Commands::Sync { hours } => {
            sync(&client, &cli.api_url, hours).await?;
        }
        Commands::Status => {
            check_status(&client, &cli.api_url).await?;
        }
    }

    Ok(())
}

// On failure prints the API's error body and yields None
async fn check_response(response: reqwest::Response) -> Result<Option<reqwest::Response>, reqwest::Error> {
    if response.status().is_success() {
        return Ok(Some(response));
    }
    let status = response.status();
    let body = response.text().await?;
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or(body);
    println!("{} {} ({})", "Error:".red().bold(), message, status);
    Ok(None)
}

async fn ask(
    client: &reqwest::Client,
    api_url: &str,
    question: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "Asking Inquisitor...".cyan().bold());
    println!("{}", "─".repeat(50).dimmed());

    let response = client
        .post(format!("{}/api/chat/query", api_url))
        .json(&json!({ "query": question }))
        .send()
        .await?;

    let Some(response) = check_response(response).await? else {
        return Ok(());
    };
    let result: ChatResponse = response.json().await?;

    print_envelope(&result.response);

    println!("\n{}", "─".repeat(50).dimmed());
    println!(
        "{} {} | {} {}",
        "Intent:".dimmed(),
        result.intent.cyan(),
        "Timeframe:".dimmed(),
        result.timeframe.magenta()
    );

    Ok(())
}

fn print_envelope(envelope: &Value) {
    let content = envelope["content"].as_str().unwrap_or_default();

    match envelope["type"].as_str().unwrap_or_default() {
        "text" => println!("\n{}", content),
        "help" => println!("\n{}", content.green()),
        "error" => println!("\n{} {}", "Error:".red().bold(), content),
        "structured" => {
            let summary = envelope["summary"].as_str().unwrap_or_default();
            println!("\n{}", summary.bold());
            print_data(&envelope["data"]);

            if let Some(rec) = envelope["recommendation"].as_str() {
                if is_alarming(rec) {
                    println!("\n{} {}", "⚠".yellow(), rec.yellow().bold());
                } else {
                    println!("\n{} {}", "✓".green(), rec.green());
                }
            }
        }
        other => println!("\n{} unknown response type {:?}", "Error:".red().bold(), other),
    }
}

fn print_data(data: &Value) {
    if data.get("topIPs").is_some() && data.get("uniqueIPs").is_some() {
        print_counts("Top IPs", &["IP", "Attempts"], count_rows(&data["topIPs"]));
    } else if let Some(by_severity) = data.get("bySeverity") {
        print_counts("By severity", &["Severity", "Threats"], severity_rows(by_severity));
    } else if let Some(events) = data.get("events") {
        let rows = event_rows(events);
        if !rows.is_empty() {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Time", "Action", "Severity", "Destination"]);
            for row in rows {
                table.add_row(row.to_vec());
            }
            println!("{table}");
        }
    } else if data.get("source").is_some() {
        print_statistics(data);
    }
}

fn print_statistics(data: &Value) {
    let source = data["source"].as_str().unwrap_or("unknown");
    println!("{} {}", "Source:".dimmed(), source.cyan());

    if let Some(total) = data["totalEvents"].as_u64() {
        println!("{} {}", "Total events:".dimmed(), total.to_string().yellow());
    }
    for (title, key) in [
        ("By severity", "threatsBySeverity"),
        ("By severity", "severityCounts"),
        ("By status", "statusCounts"),
        ("Top source IPs", "topSourceIPs"),
        ("Top source IPs", "topIPs"),
    ] {
        if data.get(key).is_some() {
            print_counts(title, &["Key", "Count"], count_rows(&data[key]));
        }
    }
}

fn print_counts(title: &str, header: &[&str], rows: Vec<(String, u64)>) {
    if rows.is_empty() {
        return;
    }
    println!("\n{}", title.cyan());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header.to_vec());
    for (label, count) in rows {
        table.add_row(vec![label, count.to_string()]);
    }
    println!("{table}");
}

async fn show_stats(
    client: &reqwest::Client,
    api_url: &str,
    hours: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{} (last {}h)", "Threat Statistics".cyan().bold(), hours);
    println!("{}", "─".repeat(50).dimmed());

    let response = client
        .get(format!("{}/api/threats/stats?hours={}", api_url, hours))
        .send()
        .await?;

    let Some(response) = check_response(response).await? else {
        return Ok(());
    };
    let report: Value = response.json().await?;

    println!("\n{}", "Database".bold());
    print_statistics(&with_source(&report["database"], "database"));

    match report.get("siem").filter(|s| !s.is_null()) {
        Some(siem) => {
            println!("\n{}", "SIEM".bold());
            print_statistics(&with_source(siem, "siem"));
        }
        None => println!("\n{} SIEM statistics unavailable", "⚠".yellow()),
    }

    println!();
    Ok(())
}

fn with_source(stats: &Value, source: &str) -> Value {
    let mut stats = stats.clone();
    if let Some(obj) = stats.as_object_mut() {
        obj.insert("source".to_string(), json!(source));
    }
    stats
}

async fn list_threats(
    client: &reqwest::Client,
    api_url: &str,
    status: Option<String>,
    severity: Option<String>,
    hours: u32,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{} (last {}h)", "Recorded Threats".cyan().bold(), hours);
    println!("{}", "─".repeat(50).dimmed());

    let mut url = format!("{}/api/threats?hours={}&limit={}", api_url, hours, limit);
    if let Some(s) = status {
        url.push_str(&format!("&status={}", urlencoding::encode(&s)));
    }
    if let Some(s) = severity {
        url.push_str(&format!("&severity={}", urlencoding::encode(&s)));
    }

    let response = client.get(&url).send().await?;

    let Some(response) = check_response(response).await? else {
        return Ok(());
    };
    let result: ThreatsResponse = response.json().await?;

    if result.count == 0 {
        println!("  {} No threats recorded in this window", "✓".green());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Detected", "Severity", "Type", "Source IP", "Status"]);
    for row in threat_rows(&result.threats) {
        table.add_row(row.to_vec());
    }
    println!("{table}");
    println!("{} {}", "Total:".dimmed(), result.count.to_string().yellow());
    println!();
    Ok(())
}

async fn sync(
    client: &reqwest::Client,
    api_url: &str,
    hours: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{} (last {}h)", "Syncing threats from SIEM".cyan().bold(), hours);
    println!("{}", "─".repeat(50).dimmed());

    let response = client
        .post(format!("{}/api/threats/sync", api_url))
        .json(&json!({ "hours": hours }))
        .send()
        .await?;

    let Some(response) = check_response(response).await? else {
        return Ok(());
    };
    let result: SyncResponse = response.json().await?;

    println!("  {} {}", "✓".green(), result.message);
    println!("  {} {}", "Processed:".dimmed(), result.processed.to_string().yellow());
    println!("  {} {}", "Inserted:".dimmed(), result.inserted.to_string().green());
    println!();
    Ok(())
}

async fn check_status(
    client: &reqwest::Client,
    api_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "System Status".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    // Check API
    print!("  API Server ({})... ", api_url);
    io::stdout().flush()?;

    match client.get(format!("{}/health", api_url)).send().await {
        Ok(resp) if resp.status().is_success() => {
            let health: HealthResponse = resp.json().await?;
            println!("{} ({})", "✓ Running".green(), health.status);

            // Re-probe the SIEM so the answer is current
            print!("  SIEM... ");
            io::stdout().flush()?;

            let siem = match client.post(format!("{}/api/siem/health", api_url)).send().await {
                Ok(resp) if resp.status().is_success() => {
                    resp.json::<HealthResponse>().await.map(|h| h.siem).unwrap_or(health.siem)
                }
                _ => health.siem,
            };
            if siem == "available" {
                println!("{}", "✓ Available".green());
            } else {
                println!("{}", "✗ Degraded (statistics served from database)".yellow());
            }
        }
        Ok(resp) => {
            println!("{} ({})", "✗ Error".red(), resp.status());
        }
        Err(e) => {
            println!("{} ({})", "✗ Down".red(), e);
        }
    }

    println!();
    Ok(())
}

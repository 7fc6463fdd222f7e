use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use skycast_core::Config;
use skycast_weather::{LookupError, LookupReport, WeatherLookup};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Longest query forwarded to the geocoder.
const MAX_QUERY_CHARS: usize = 100;
const MIN_QUERY_CHARS: usize = 2;

#[derive(Parser)]
#[command(name = "skycast")]
#[command(about = "Current weather for a place name, e.g. \"paris, tx\"", long_about = None)]
struct Cli {
    /// Place to look up. Reads one query per line from stdin when omitted.
    query: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Config file to use instead of the platform default
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    skycast_core::init()?;

    let (config, _validation) = Config::load_validated(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let lookup = WeatherLookup::from_config(&config).context("Failed to build HTTP client")?;

    tracing::info!("Skycast started");

    match cli.query {
        Some(query) => run_once(&lookup, &query, cli.json).await,
        None => {
            run_interactive(&lookup, cli.json).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Single lookup; a failed lookup maps to a non-zero exit status.
async fn run_once(lookup: &WeatherLookup, raw: &str, json: bool) -> Result<ExitCode> {
    if handle_query(lookup, raw, json).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// One lookup per input line until EOF. Failures are reported and the loop
/// keeps going; the breaker carries over between lines.
async fn run_interactive(lookup: &WeatherLookup, json: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        handle_query(lookup, &line, json).await?;
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}

/// Run a single query and print the outcome. Returns whether it succeeded.
async fn handle_query(lookup: &WeatherLookup, raw: &str, json: bool) -> Result<bool> {
    let Some(query) = sanitize_query(raw) else {
        println!("Please enter at least {} characters.", MIN_QUERY_CHARS);
        return Ok(false);
    };

    tracing::debug!("Looking up {}", query);

    match lookup.lookup(&query).await {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render(&report));
            }
            Ok(true)
        }
        Err(e) => {
            report_error(&e);
            Ok(false)
        }
    }
}

fn report_error(err: &LookupError) {
    if err.is_upstream_fault() {
        tracing::error!("Lookup failed: {}", err);
    } else {
        tracing::warn!("Lookup failed: {}", err);
    }
    println!("{}", err.user_message());
}

/// Trim, drop angle brackets and cap the length. `None` when too short.
fn sanitize_query(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>'))
        .take(MAX_QUERY_CHARS)
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.chars().count() < MIN_QUERY_CHARS {
        None
    } else {
        Some(cleaned)
    }
}

fn render(report: &LookupReport) -> String {
    let weather = &report.weather;

    let mut wind = format!("Wind {} km/h", weather.windspeed);
    if let Some(degrees) = weather.wind_direction {
        wind.push(' ');
        wind.push_str(compass_point(degrees));
    }

    let mut lines = vec![
        report.place.display_name(),
        format!("{}°C", weather.temperature),
        wind,
    ];
    if let Some(condition) = weather.condition {
        lines.push(condition.description().to_string());
    }
    lines.push(weather.observed_at.format("%Y-%m-%d %H:%M").to_string());

    lines.join("\n")
}

fn compass_point(degrees: f64) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let sector = (degrees.rem_euclid(360.0) / 45.0).round() as usize % POINTS.len();
    POINTS[sector]
}

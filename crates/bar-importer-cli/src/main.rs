use anyhow::{Context, Result};
use bar_importer_core::bar::Bar;
use bar_importer_core::cancel::CancellationToken;
use bar_importer_core::period::Period;
use bar_importer_core::range::RangeNormalizer;
use bar_importer_core::zone::{ZoneConfig, resolve_zone, tz_var_zone_name};
use bar_importer_providers::importer::{ImportRequest, SeriesImporter};
use bar_importer_providers::yahoo::YahooFetcher;
use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "bar-importer",
    about = "Import daily, weekly and monthly price bars"
)]
struct Cli {
    /// Caller time zone for --start/--end (IANA name; defaults to $TZ, then the host zone)
    #[arg(long)]
    local_tz: Option<String>,

    /// Time zone the provider anchors dates to
    #[arg(long, default_value = "America/New_York")]
    provider_tz: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch bars for a symbol and print them
    Import {
        /// Symbol to fetch
        #[arg(short, long)]
        symbol: String,

        /// Start date (YYYY-MM-DD, defaults to the earliest supported date)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD, defaults to the latest supported date)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Bar period: daily, weekly, monthly
        #[arg(long, default_value = "daily")]
        period: Period,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// Override the Yahoo chart endpoint
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Print the range that would be sent to the provider
    Range {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn midnight(date: Option<NaiveDate>) -> Option<NaiveDateTime> {
    date.and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn host_zone() -> Option<String> {
    iana_time_zone::get_timezone().ok()
}

/// Caller zone from `--local-tz`, then `$TZ`, then the host zone, then UTC.
///
/// An unknown `--local-tz` is fatal. An unusable `$TZ` (POSIX rule strings,
/// `:/etc/localtime`) defers to the host zone.
fn local_zone(
    flag: Option<&str>,
    tz_var: Option<&str>,
    host: impl FnOnce() -> Option<String>,
) -> Result<Tz> {
    if let Some(flag) = flag {
        if let Some(name) = tz_var_zone_name(flag) {
            return resolve_zone(name).with_context(|| format!("failed to resolve --local-tz {flag}"));
        }
    } else if let Some(value) = tz_var {
        if let Some(name) = tz_var_zone_name(value) {
            match resolve_zone(name) {
                Ok(tz) => return Ok(tz),
                Err(e) => warn!("ignoring TZ={value}: {e}"),
            }
        }
    }

    match host().map(|name| resolve_zone(&name)) {
        Some(Ok(tz)) => Ok(tz),
        Some(Err(e)) => {
            warn!("host time zone unusable ({e}), using UTC");
            Ok(chrono_tz::UTC)
        }
        None => {
            warn!("host time zone unavailable, using UTC");
            Ok(chrono_tz::UTC)
        }
    }
}

fn zone_config(cli: &Cli) -> Result<ZoneConfig> {
    let tz_var = std::env::var("TZ").ok();
    let local = local_zone(cli.local_tz.as_deref(), tz_var.as_deref(), host_zone)?;
    let provider = resolve_zone(&cli.provider_tz)
        .with_context(|| format!("failed to resolve --provider-tz {}", cli.provider_tz))?;
    Ok(ZoneConfig { local, provider })
}

fn format_csv(bar: &Bar) -> String {
    format!(
        "{},{},{},{},{},{}",
        bar.timestamp.to_rfc3339(),
        bar.open,
        bar.high,
        bar.low,
        bar.close,
        bar.volume
    )
}

fn print_bars(bars: &[Bar], format: Format) -> Result<()> {
    match format {
        Format::Csv => {
            println!("timestamp,open,high,low,close,volume");
            for bar in bars {
                println!("{}", format_csv(bar));
            }
        }
        Format::Json => {
            for bar in bars {
                println!("{}", serde_json::to_string(bar).context("failed to encode bar")?);
            }
        }
    }
    Ok(())
}

async fn cmd_import(
    zones: ZoneConfig,
    request: ImportRequest,
    format: Format,
    base_url: Option<String>,
) -> Result<()> {
    let fetcher = match base_url {
        Some(url) => YahooFetcher::with_base_url(url),
        None => YahooFetcher::new(),
    }
    .context("failed to create Yahoo fetcher")?;
    let importer = SeriesImporter::new(fetcher, RangeNormalizer::new(zones));

    let token = CancellationToken::new();
    let on_ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_ctrl_c.cancel();
        }
    });

    let symbol = request.symbol.to_uppercase();
    let request = ImportRequest { symbol, ..request };
    let bars = importer
        .import(&request, &token)
        .await
        .with_context(|| format!("failed to import {}", request.symbol))?;

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        info!(
            "{}: {} bar(s), {} to {}",
            request.symbol,
            bars.len(),
            first.timestamp,
            last.timestamp
        );
    } else {
        info!("{}: no bars returned", request.symbol);
    }

    print_bars(&bars, format)
}

fn range_lines(zones: ZoneConfig, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<String> {
    let range = RangeNormalizer::new(zones).normalize(midnight(start), midnight(end));
    let mut lines = vec![
        format!("start: {}", range.start.to_rfc3339()),
        format!("end:   {}", range.end.to_rfc3339()),
    ];
    if range.start > range.end {
        lines.push("note: start is after end; the provider decides what that means".to_string());
    }
    lines
}

fn cmd_range(zones: ZoneConfig, start: Option<NaiveDate>, end: Option<NaiveDate>) {
    for line in range_lines(zones, start, end) {
        println!("{line}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let zones = zone_config(&cli)?;
    info!("local zone {}, provider zone {}", zones.local, zones.provider);

    match cli.command {
        Commands::Import {
            symbol,
            start,
            end,
            period,
            format,
            base_url,
        } => {
            let request = ImportRequest {
                symbol,
                start: midnight(start),
                end: midnight(end),
                period,
            };
            cmd_import(zones, request, format, base_url).await?;
        }
        Commands::Range { start, end } => {
            cmd_range(zones, start, end);
        }
    }

    Ok(())
}

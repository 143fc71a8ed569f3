use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use proxy_verifier::{
    logging,
    proxy::report::{self, Summary},
    Config, ProbeConfig, ProxyParser, VerifyOptions,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A proxy verifier with bounded concurrency and exit IP geolocation
#[derive(Parser)]
#[command(name = "proxy-verifier")]
#[command(about = "A proxy verifier with bounded concurrency and exit IP geolocation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse proxies from a file and print their probe addresses
    Parse {
        /// Input file containing proxies, one per line
        input: PathBuf,
    },
    /// Check proxies and report reachability, latency and location
    Check {
        /// Input file containing proxies, one per line
        input: PathBuf,
        #[command(flatten)]
        probe: ProbeArgs,
        /// Skip the geolocation lookup
        #[arg(long)]
        no_geo: bool,
        /// Print outcomes as a JSON array
        #[arg(long)]
        json: bool,
        /// Export proxy,ip,country CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Output file for good proxies
        #[arg(short, long)]
        good: Option<PathBuf>,
        /// Output file for bad proxies
        #[arg(short, long)]
        bad: Option<PathBuf>,
    },
    /// Locate an IP through the first working proxy in the list
    Locate {
        /// Input file containing proxies, one per line
        input: PathBuf,
        /// IP to look up; defaults to the chosen proxy's exit IP
        #[arg(long)]
        ip: Option<String>,
        #[command(flatten)]
        probe: ProbeArgs,
    },
}

#[derive(clap::Args)]
struct ProbeArgs {
    /// Number of concurrent probes; non-positive values fall back to 10
    #[arg(short = 'n', long, default_value = "10", allow_negative_numbers = true)]
    threads: i64,
    /// Probe timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,
    /// Geolocation timeout in seconds
    #[arg(long, default_value = "15")]
    geo_timeout: u64,
    /// URL to test proxies against
    #[arg(long, default_value = proxy_verifier::proxy::checker::DEFAULT_TEST_URL)]
    test_url: String,
    /// Geolocation service URL, `{ip}` is replaced by the address
    #[arg(long, default_value = proxy_verifier::proxy::geo::DEFAULT_GEO_URL)]
    geo_url: String,
}

impl ProbeArgs {
    fn to_config(&self, resolve_geo: bool) -> Config {
        Config {
            probe: ProbeConfig::new()
                .with_target_url(self.test_url.clone())
                .with_geo_url(self.geo_url.clone())
                .with_timeout(Duration::from_secs(self.timeout))
                .with_geo_timeout(Duration::from_secs(self.geo_timeout)),
            verify: VerifyOptions::new()
                .with_max_concurrency(self.threads)
                .with_resolve_geo(resolve_geo),
        }
    }
}

fn load_proxies(input: &Path) -> Result<Vec<String>> {
    let proxies = ProxyParser::read_file(input)?;
    if proxies.is_empty() {
        return Err(anyhow!("No proxies provided in {:?}", input));
    }
    Ok(proxies)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.verbose)?;

    match cli.command {
        Commands::Parse { input } => {
            let proxies = load_proxies(&input)?;
            println!("Parsed {} proxies from {:?}", proxies.len(), input);

            for raw in &proxies {
                match ProxyParser::parse(raw) {
                    Ok(descriptor) => println!("{}", descriptor.probe_url()),
                    Err(e) => eprintln!("{}: {}", raw, e),
                }
            }
        }
        Commands::Check {
            input,
            probe,
            no_geo,
            json,
            csv,
            good,
            bad,
        } => {
            let proxies = load_proxies(&input)?;
            let config = probe.to_config(!no_geo);

            if !json {
                println!("Loaded {} proxies from {:?}", proxies.len(), input);
                println!(
                    "Checking with {} threads, timeout: {}s",
                    config.verify.max_concurrency, probe.timeout
                );
                println!("Test URL: {}", config.probe.target_url);
                println!();
            }

            let outcomes = config.verifier().verify(&proxies, config.verify).await;
            let (good_results, bad_results) = report::partition(&outcomes);

            if json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                println!("{}", Summary::from_outcomes(&outcomes));

                if !good_results.is_empty() {
                    println!("\nWorking proxies:");
                    for outcome in &good_results {
                        let ip = outcome.exit_ip().unwrap_or_default();
                        let latency = outcome.latency_ms().unwrap_or_default();
                        let location = match (outcome.geo_result(), outcome.geo_error()) {
                            (Some(geo), _) => geo.short_display(),
                            (None, Some(err)) => format!("location error: {}", err),
                            (None, None) => String::new(),
                        };
                        println!(
                            "  {} -> {} ({:.2}ms) {}",
                            outcome.original_input, ip, latency, location
                        );
                    }
                }

                if !bad_results.is_empty() {
                    println!("\nFailed proxies:");
                    for outcome in &bad_results {
                        if let Some(err) = outcome.error() {
                            println!("  {} [{}] {}", outcome.original_input, err.kind, err);
                        }
                    }
                }
            }

            if let Some(csv_path) = csv {
                report::save_csv(&outcomes, &csv_path)?;
                eprintln!("Saved CSV report to {:?}", csv_path);
            }

            if let Some(good_path) = good {
                report::save_inputs(&good_results, &good_path)?;
                eprintln!(
                    "Saved {} good proxies to {:?}",
                    good_results.len(),
                    good_path
                );
            }

            if let Some(bad_path) = bad {
                report::save_inputs(&bad_results, &bad_path)?;
                eprintln!("Saved {} bad proxies to {:?}", bad_results.len(), bad_path);
            }
        }
        Commands::Locate { input, ip, probe } => {
            let proxies = load_proxies(&input)?;
            let config = probe.to_config(false);

            let result = config
                .verifier()
                .locate(&proxies, ip.as_deref(), config.verify)
                .await;

            match result {
                Ok(located) => println!("{}", serde_json::to_string_pretty(&located)?),
                Err(e) => {
                    return Err(match e.proxy_used() {
                        Some(proxy) => anyhow!("{} (proxy used: {})", e, proxy),
                        None => anyhow!("{}", e),
                    });
                }
            }
        }
    }

    Ok(())
}

//! ctlmatch: CLI tool for checking rule files and matching requests against them.

use clap::{Parser, Subcommand};
use ctlmatch::{
    CollectingSink, ControlMatcher, HttpRequestData, LineRecord, LogSink, MatchedLine,
    MatcherConfig,
};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ctlmatch")]
#[command(version = "0.1.0")]
#[command(about = "Check rule files and match requests against them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the match table and report rejected lines
    Check {
        /// Rule file
        file: PathBuf,

        /// YAML matcher profile (name, flags, tags)
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Print the built table
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print every rule line that applies to a request
    Match {
        /// Rule file
        file: PathBuf,

        /// YAML matcher profile (name, flags, tags)
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Request hostname
        #[arg(long)]
        host: Option<String>,

        /// Request URL
        #[arg(long)]
        url: Option<String>,

        /// Destination address
        #[arg(long)]
        dest_ip: Option<IpAddr>,

        /// Client address
        #[arg(long)]
        client_ip: Option<IpAddr>,

        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Check {
            file,
            profile,
            verbose,
        } => check_file(&file, profile.as_deref(), verbose),
        Commands::Match {
            file,
            profile,
            host,
            url,
            dest_ip,
            client_ip,
            json,
        } => {
            let rdata = HttpRequestData {
                hostname: host,
                url,
                dest_ip,
                src_ip: client_ip,
            };
            match_request(&file, profile.as_deref(), &rdata, json)
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn matcher_config(file: &Path, profile: Option<&Path>) -> ctlmatch::Result<MatcherConfig> {
    let config = match profile {
        Some(path) => MatcherConfig::from_yaml_file(path)?,
        None => MatcherConfig::new(
            file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "ctlmatch".to_string()),
        ),
    };
    Ok(config.with_file_path(file))
}

fn check_file(
    file: &Path,
    profile: Option<&Path>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = matcher_config(file, profile)?;
    let text = std::fs::read_to_string(file)?;

    let sink = CollectingSink::new();
    let matcher = ControlMatcher::<LineRecord>::build(config, &text, &sink);

    println!(
        "{}: {} entries classified, {} stored",
        matcher.name(),
        matcher.num_entries(),
        matcher.inserted_entries()
    );
    for msg in sink.messages() {
        println!("  {}", msg);
    }
    if verbose {
        print!("{}", matcher.describe());
    }

    if !sink.is_empty() {
        return Err(format!("{} line(s) rejected", sink.len()).into());
    }
    Ok(())
}

fn match_request(
    file: &Path,
    profile: Option<&Path>,
    rdata: &HttpRequestData,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = matcher_config(file, profile)?;
    let text = std::fs::read_to_string(file)?;
    let matcher = ControlMatcher::<LineRecord>::build(config, &text, &LogSink);

    let mut hits: Vec<MatchedLine> = Vec::new();
    matcher.match_request(rdata, &mut hits);

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("no match");
    }
    for hit in &hits {
        let mods: Vec<String> = hit
            .modifiers
            .iter()
            .map(|(label, value)| format!("{}={}", label, value))
            .collect();
        println!("line {}: {}", hit.line_num, mods.join(" "));
    }
    Ok(())
}

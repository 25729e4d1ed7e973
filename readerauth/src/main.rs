//! readerauth: Command-line tool for checking certificate chains against a
//! reader-authentication trust profile.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use readerauth_lib::{Certificate, ProfileConfig, ProfileReport, ValidatorConfig};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "readerauth",
    about = "Check certificate chains against a reader-authentication trust profile",
    long_about = "readerauth decides whether presented X.509 certificate chains are\n\
                  trusted under an ISO/IEC 18013-5 style reader-authentication\n\
                  profile. Every validator of the profile must pass.\n\n\
                  Input format (PEM vs DER) is auto-detected. Diagnostics are\n\
                  written to stderr; set RUST_LOG or pass --verbose for more.",
    after_help = "EXAMPLES:\n\
                  \n  readerauth verify --anchor root.pem chain.pem\
                  \n  readerauth verify --anchor root.pem --report chains/\
                  \n  readerauth verify --anchor root.pem --profile strict.json chain.pem\
                  \n  readerauth ski leaf.pem\
                  \n  readerauth profile > profile.json"
)]
struct Cli {
    /// Emit per-validator debug diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate chains against a trust anchor (exit 0 = trusted, 2 = fail)
    #[command(after_help = "Each CHAIN is a PEM bundle with the leaf certificate first, a\n\
                      single DER certificate, or a directory of such files. Chains\n\
                      are validated in parallel against one profile.\n\
                      \nEXAMPLES:\n\
                      \n  readerauth verify --anchor root.pem chain.pem\
                      \n  readerauth verify --anchor root.pem --attime 2025-01-01T00:00:00Z chain.pem\
                      \n  readerauth verify --anchor root.pem --json chain.pem\
                      \n  cat chain.pem | readerauth verify --anchor root.pem")]
    Verify {
        /// Chain files or directories. Reads one chain from stdin if omitted.
        chains: Vec<PathBuf>,
        /// Trust anchor certificate (PEM or DER)
        #[arg(long, value_name = "FILE")]
        anchor: PathBuf,
        /// Profile configuration JSON (default: the reader-auth preset)
        #[arg(long, value_name = "FILE")]
        profile: Option<PathBuf>,
        /// Check validity at this time: Unix seconds or RFC 3339
        #[arg(long, value_name = "TIME")]
        attime: Option<String>,
        /// Show the outcome of every validator, not only the verdict
        #[arg(long)]
        report: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Only print failures
        #[arg(long)]
        failures_only: bool,
        /// Recurse into subdirectories (directory mode)
        #[arg(short, long)]
        recurse: bool,
    },
    /// Print both derived Subject Key Identifiers of a certificate
    #[command(after_help = "Shows the RFC 5280 (SHA-1) and RFC 7093 (truncated SHA-256)\n\
                      derivations of the public key and which one, if any, the\n\
                      certificate's Subject Key Identifier extension declares.\n\
                      \nEXAMPLES:\n\
                      \n  readerauth ski leaf.pem\
                      \n  readerauth ski --json leaf.der")]
    Ski {
        /// Certificate file. Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Print the reader-auth preset profile, or check a profile file
    #[command(after_help = "EXAMPLES:\n\
                      \n  readerauth profile\
                      \n  readerauth profile --check custom.json")]
    Profile {
        /// Profile configuration to check and print in normalized form
        #[arg(long, value_name = "FILE")]
        check: Option<PathBuf>,
    },
}

/// Maximum file size for certificate inputs (10 MiB).
const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            let meta = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat file: {}", path.display()))?;
            if meta.len() > MAX_INPUT_BYTES {
                anyhow::bail!(
                    "File too large ({} bytes, max {} bytes): {}",
                    meta.len(),
                    MAX_INPUT_BYTES,
                    path.display()
                );
            }
            std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .take(MAX_INPUT_BYTES)
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

/// Parse a `--attime` value: plain Unix seconds or an RFC 3339 timestamp.
fn parse_attime(s: &str) -> Result<i64> {
    if let Ok(secs) = s.parse::<i64>() {
        return Ok(secs);
    }
    let at = humantime::parse_rfc3339_weak(s)
        .with_context(|| format!("Invalid time: '{s}' (expected Unix seconds or RFC 3339)"))?;
    let secs = at
        .duration_since(UNIX_EPOCH)
        .with_context(|| format!("Time before the Unix epoch: '{s}'"))?
        .as_secs();
    i64::try_from(secs).with_context(|| format!("Time out of range: '{s}'"))
}

/// Pin every Period validator of `config` to `at_time`.
fn pin_period(config: &mut ProfileConfig, at_time: i64) {
    for entry in &mut config.validators {
        if let ValidatorConfig::Period { at_time: slot } = entry {
            *slot = Some(at_time);
        }
    }
}

/// Check if a path has a certificate file extension (.pem, .der, .crt, .cer).
fn is_cert_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("pem") || ext.eq_ignore_ascii_case("der")
            || ext.eq_ignore_ascii_case("crt") || ext.eq_ignore_ascii_case("cer")
    )
}

/// Find all certificate files in a directory, sorted.
fn find_cert_files(dir: &Path, recurse: bool) -> Vec<PathBuf> {
    let walker = if recurse {
        walkdir::WalkDir::new(dir)
    } else {
        walkdir::WalkDir::new(dir).max_depth(1)
    };
    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_cert_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Expand directories among the given paths into their certificate files.
fn collect_chain_files(paths: &[PathBuf], recurse: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = find_cert_files(path, recurse);
            if found.is_empty() {
                anyhow::bail!(
                    "No certificate files (.pem, .der, .crt, .cer) found in {}",
                    path.display()
                );
            }
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/// Outcome of validating one chain file.
struct ChainResult {
    label: String,
    outcome: Result<ProfileReport, String>,
}

impl ChainResult {
    fn trusted(&self) -> bool {
        matches!(&self.outcome, Ok(r) if r.trusted)
    }

    fn to_json(&self) -> serde_json::Value {
        match &self.outcome {
            Ok(report) => serde_json::json!({
                "file": self.label,
                "trusted": report.trusted,
                "report": report,
            }),
            Err(e) => serde_json::json!({
                "file": self.label,
                "trusted": false,
                "error": e,
            }),
        }
    }
}

fn check_chain(
    label: String,
    input: Result<Vec<u8>>,
    profile: &readerauth_lib::Profile,
    anchor: &Certificate,
) -> ChainResult {
    let outcome = input
        .and_then(|data| Ok(readerauth_lib::parse_chain(&data)?))
        .map_err(|e| format!("{:#}", e))
        .and_then(|chain| {
            profile
                .evaluate(&chain, anchor)
                .map_err(|e| e.to_string())
        });
    ChainResult { label, outcome }
}

/// Print one chain result: trusted chains to stdout, failures to stderr.
fn print_chain_result(result: &ChainResult, report: bool, failures_only: bool) {
    match &result.outcome {
        Ok(r) if r.trusted => {
            if !failures_only {
                println!("{}: {}", result.label, r);
            }
        }
        Ok(r) => eprintln!("{}: {}", result.label, r),
        Err(e) => eprintln!("{}: FAIL (error: {})", result.label, e),
    }
    if let (true, Ok(r)) = (report, &result.outcome) {
        if failures_only && r.trusted {
            return;
        }
        for o in &r.outcomes {
            println!(
                "  {:<22} {}",
                o.validator,
                if o.passed { "pass" } else { "FAIL" }
            );
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("readerauth_lib=debug,readerauth=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Verify {
            chains,
            anchor,
            profile,
            attime,
            report,
            json,
            failures_only,
            recurse,
        } => {
            let anchor_data = read_input(Some(anchor.as_path()))?;
            let anchor = readerauth_lib::parse_cert(&anchor_data)
                .with_context(|| format!("Failed to parse trust anchor: {}", anchor.display()))?;

            let mut config = match profile {
                Some(path) => ProfileConfig::from_file(path)
                    .with_context(|| format!("Failed to load profile: {}", path.display()))?,
                None => ProfileConfig::reader_auth(),
            };
            if let Some(at) = attime {
                pin_period(&mut config, parse_attime(at)?);
            }
            let profile = config.build().context("Invalid profile")?;
            tracing::debug!(validators = profile.len(), "profile ready");

            let results: Vec<ChainResult> = if chains.is_empty() {
                vec![check_chain(
                    "stdin".to_string(),
                    read_input(None),
                    &profile,
                    &anchor,
                )]
            } else {
                let files = collect_chain_files(chains, *recurse)?;
                files
                    .par_iter()
                    .map(|f| {
                        check_chain(
                            f.display().to_string(),
                            read_input(Some(f.as_path())),
                            &profile,
                            &anchor,
                        )
                    })
                    .collect()
            };

            if *json {
                let values: Vec<serde_json::Value> = results
                    .iter()
                    .filter(|r| !(*failures_only && r.trusted()))
                    .map(ChainResult::to_json)
                    .collect();
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else {
                for r in &results {
                    print_chain_result(r, *report, *failures_only);
                }
            }

            if results.iter().any(|r| !r.trusted()) {
                std::process::exit(2);
            }
        }
        Commands::Ski { file, json } => {
            let input = read_input(file.as_deref())?;
            let cert = readerauth_lib::parse_cert(&input)?;
            let ids = readerauth_lib::KeyIdentifiers::for_certificate(&cert)?;

            let declared = match cert.extension_value(readerauth_lib::oid::EXT_SUBJECT_KEY_ID) {
                Some(readerauth_lib::ExtensionValue::SubjectKeyIdentifier(ski)) => {
                    Some(ski.as_slice())
                }
                _ => None,
            };
            let method = declared.and_then(|d| ids.matching_method(d));

            if *json {
                let value = serde_json::json!({
                    "subject": cert.subject_string(),
                    "rfc5280_sha1": readerauth_lib::hex_colon_upper(&ids.rfc5280),
                    "rfc7093_sha256_160": readerauth_lib::hex_colon_upper(&ids.rfc7093),
                    "declared": declared.map(readerauth_lib::hex_colon_upper),
                    "matches": method,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!(
                    "RFC 5280 SHA-1:       {}",
                    readerauth_lib::hex_colon_upper(&ids.rfc5280)
                );
                println!(
                    "RFC 7093 SHA-256/160: {}",
                    readerauth_lib::hex_colon_upper(&ids.rfc7093)
                );
                match (declared, method) {
                    (Some(d), Some(m)) => {
                        println!("Declared:             {} ({})", readerauth_lib::hex_colon_upper(d), m)
                    }
                    (Some(d), None) => println!(
                        "Declared:             {} (matches neither)",
                        readerauth_lib::hex_colon_upper(d)
                    ),
                    (None, _) => println!("Declared:             (no Subject Key Identifier)"),
                }
            }
        }
        Commands::Profile { check } => {
            let config = match check {
                Some(path) => {
                    let config = ProfileConfig::from_file(path)
                        .with_context(|| format!("Failed to load profile: {}", path.display()))?;
                    config.build().context("Invalid profile")?;
                    config
                }
                None => ProfileConfig::reader_auth(),
            };
            println!("{}", config.to_json()?);
        }
    }

    Ok(())
}

//! Operations ingester
//!
//! Sends workbooks to a running operations API, one after the other.
//!
//! Usage:
//!   `cargo run --bin ingest -- --url http://localhost:3000 workbooks/`
//!
//! Directories are scanned (not recursively) for spreadsheet files. With
//! `--dry-run` the workbooks are only consolidated and the resulting JSON is
//! written next to `--output` instead of being added to the database.

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, Command};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, multipart};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsb", "xlsx", "xlsm", "xls", "ods"];

struct Ingester {
    client: Client,
    base_url: String,
    replace: bool,
}

#[derive(Debug, Default)]
struct Tally {
    ingested: usize,
    failed: Vec<(String, String)>,
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Expand directories into the workbooks they contain, sorted by name
fn collect_workbooks(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut workbooks = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("reading directory {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && is_workbook(path))
                .collect();
            found.sort();
            workbooks.extend(found);
        } else if is_workbook(input) {
            workbooks.push(input.clone());
        } else {
            bail!("{} is not a spreadsheet workbook", input.display());
        }
    }
    Ok(workbooks)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("workbook")
        .to_string()
}

impl Ingester {
    fn new(base_url: &str, replace: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            replace,
        })
    }

    async fn post_workbook(&self, endpoint: &str, path: &Path) -> Result<Value> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let part = multipart::Part::bytes(bytes).file_name(file_name(path));
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("sending {}", path.display()))?;

        let status = response.status();
        let body: Value = response.json().await.context("decoding response")?;
        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .map_or_else(|| body.to_string(), str::to_string);
            bail!("HTTP {status}: {message}");
        }
        Ok(body)
    }

    /// Add one workbook to the database, returning the report of that file
    async fn ingest(&self, path: &Path) -> Result<Value> {
        let endpoint = format!("/api/operations?replace={}", self.replace);
        let report = self.post_workbook(&endpoint, path).await?;
        let file = report["files"]
            .get(0)
            .cloned()
            .context("empty ingestion report")?;
        if file["status"] == "failed" {
            bail!(
                "{}",
                file["error"].as_str().unwrap_or("ingestion failed").to_string()
            );
        }
        Ok(file)
    }

    /// Consolidate one workbook without persisting, saving the JSON under `output`
    async fn consolidate(&self, path: &Path, output: &Path) -> Result<Value> {
        let operation = self
            .post_workbook("/api/operations/consolidate", path)
            .await?;

        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("operation");
        let target = output.join(format!("{stem}.json"));
        tokio::fs::create_dir_all(output).await?;
        tokio::fs::write(&target, serde_json::to_string_pretty(&operation)?)
            .await
            .with_context(|| format!("writing {}", target.display()))?;
        Ok(operation)
    }

    async fn run(&self, workbooks: &[PathBuf], dry_run: Option<&Path>) -> Tally {
        let pb = ProgressBar::new(workbooks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));

        let mut tally = Tally::default();
        for path in workbooks {
            let name = file_name(path);
            pb.set_message(name.clone());

            let outcome = match dry_run {
                Some(output) => self.consolidate(path, output).await,
                None => self.ingest(path).await,
            };
            match outcome {
                Ok(_) => tally.ingested += 1,
                Err(e) => tally.failed.push((name, format!("{e:#}"))),
            }
            pb.inc(1);
        }
        pb.finish_with_message("done");
        tally
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Operations Ingester")
        .version("1.0")
        .about("Sends operation workbooks to the operations API")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("API base URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new("replace")
                .short('r')
                .long("replace")
                .help("Replace operations already ingested from the same workbook")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .value_name("OUTPUT_DIR")
                .help("Only consolidate, writing one JSON file per workbook to OUTPUT_DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("paths")
                .value_name("PATH")
                .help("Workbooks or directories of workbooks")
                .required(true)
                .num_args(1..)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .get_matches();

    let base_url = matches
        .get_one::<String>("url")
        .context("missing API URL")?;
    let replace = matches.get_flag("replace");
    let dry_run = matches.get_one::<PathBuf>("dry-run");
    let inputs: Vec<PathBuf> = matches
        .get_many::<PathBuf>("paths")
        .context("missing paths")?
        .cloned()
        .collect();

    let workbooks = collect_workbooks(&inputs)?;

    println!("{}", style("Operations Ingester").bold());
    println!("{}", style("━".repeat(40)).dim());
    println!("API URL:   {}", style(base_url).cyan());
    println!("Workbooks: {}", style(workbooks.len()).bold());
    if let Some(output) = dry_run {
        println!("Dry run:   {}", style(output.display()).yellow());
    }

    if workbooks.is_empty() {
        println!("{} Nothing to ingest", style("!").yellow());
        return Ok(());
    }

    let ingester = Ingester::new(base_url, replace)?;
    let tally = ingester.run(&workbooks, dry_run.map(PathBuf::as_path)).await;

    println!(
        "{} {} workbook(s) processed",
        style("✓").green(),
        style(tally.ingested).bold().green()
    );
    for (name, error) in &tally.failed {
        println!("{} {}: {}", style("✗").red(), style(name).bold(), error);
    }

    if tally.failed.is_empty() {
        Ok(())
    } else {
        bail!("{} workbook(s) failed", tally.failed.len())
    }
}

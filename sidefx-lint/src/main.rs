// ABOUTME: provides a cli that checks sidefx scripts before they are run.
// ABOUTME: prints a deterministic json verdict and fails when a block would abort the run.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::io::AsyncReadExt;

use sidefx_lint::lint_script;

#[derive(Debug, Parser)]
#[command(name = "sidefx-lint")]
struct Args {
    /// Script file to check. Reads stdin when neither --file nor --json is given.
    #[arg(long)]
    file: Option<String>,

    /// Inline script text.
    #[arg(long)]
    json: Option<String>,

    /// Treat warnings as failures.
    #[arg(long)]
    deny_warnings: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let input = read_input(args.file.as_deref(), args.json.as_deref()).await?;
    let report = lint_script(&input);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.ok || (args.deny_warnings && report.has_warnings()) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn read_input(file: Option<&str>, json: Option<&str>) -> anyhow::Result<String> {
    if let Some(json) = json {
        return Ok(json.to_string());
    }

    if let Some(file) = file {
        return tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("read {file}"));
    }

    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    Ok(input)
}

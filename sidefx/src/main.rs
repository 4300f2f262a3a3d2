// ABOUTME: runs a script of file, process and network side effects read from stdin or a file.
// ABOUTME: used to generate known system events for monitoring and auditing agents under test.

mod actions;
mod cli;
mod dispatch;
mod errors;
mod identity;
mod logging;
mod reader;
#[cfg(test)]
mod test_support;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncRead, BufReader};

use crate::actions::ExecOptions;
use crate::dispatch::Dispatcher;
use crate::errors::FatalError;
use crate::logging::{LogConfig, Logger};
use crate::reader::BlockReader;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = cli::Args::parse();

    let logger = Logger::init(&LogConfig {
        level: args.log_level,
        format: args.log_format,
        file: args.log_file.clone(),
    })?;

    let options = ExecOptions {
        exit_code_policy: args.exit_code_policy,
    };
    let dispatcher = Dispatcher::new(options, logger.dispatch().clone());

    let outcome = match open_input(args.input.as_deref()).await {
        Ok(input) => dispatcher.run(BlockReader::new(BufReader::new(input))).await,
        Err(err) => dispatcher.terminate(&err),
    };

    logger.shutdown();
    Ok(outcome.into())
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncRead + Unpin + Send>, FatalError> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path).await.map_err(|source| FatalError::Open {
                path: path.display().to_string(),
                source,
            })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing::error;

use folderstore_agent::config::Cli;
use folderstore_agent::engine::TransferEngine;
use folderstore_agent::git::{self, GitSettings};
use folderstore_agent::{logging, service};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();

    let cli = Cli::parse();
    let settings = GitSettings::load().await;
    let config = match cli.resolve(&settings) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", Cli::command().render_usage());
            return ExitCode::from(e.exit_code());
        }
    };

    let git_dir = match git::git_dir().await {
        Ok(dir) => dir,
        Err(e) => {
            error!("Unable to retrieve git dir: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let engine = TransferEngine::new(config, git_dir);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    match service::serve(&engine, stdin, std::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

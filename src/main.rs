mod cli;
mod engine;
mod error;
mod logging;
mod model;
mod notify;
mod orchestrator;
mod run_log;
mod text_summary;

use clap::error::ErrorKind;
use clap::Parser;
use error::SyncError;

// Runs are strictly sequential.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match cli::Cli::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            cli::report_usage_error(
                &e,
                std::env::var("SLACK_WEBHOOK_URL").ok(),
                std::env::var("QUERY_ID").ok(),
            )
            .await;
            let _ = e.print();
            std::process::exit(2);
        }
    };
    logging::init(args.silent);

    match cli::run(args).await {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            eprintln!("{e:#}");
            let config_error = e
                .downcast_ref::<SyncError>()
                .is_some_and(SyncError::is_config);
            std::process::exit(if config_error { 2 } else { 1 });
        }
    }
}

use genmig_cli::{command, execute, logging, Invocation};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = command().get_matches();
    logging::init(matches.get_count("verbose"));

    let invocation = match Invocation::from_matches(&matches) {
        Ok(invocation) => invocation,
        Err(error) => {
            eprintln!("genmig: {error:#}");
            return ExitCode::FAILURE;
        }
    };

    match execute(invocation, &mut std::io::stdout()).await {
        Ok(exit) => exit.into(),
        Err(error) => {
            eprintln!("genmig: {error:#}");
            ExitCode::FAILURE
        }
    }
}

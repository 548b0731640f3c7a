use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = cleanup_buddy::run() {
        eprintln!("error: {err:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

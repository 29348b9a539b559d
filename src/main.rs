use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("round42_kbfix=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = round42_kbfix::cli::Args::parse();
    if let Err(err) = round42_kbfix::run(args) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

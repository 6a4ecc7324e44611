use clap::Parser;

mod cli;
mod live;
mod oracles;
mod presenter;
mod still;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    cli::dispatch(cli::Cli::parse())
}

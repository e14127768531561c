use clap::Parser;
use memecanon::Opts;
use memecanon::cli::SubCommandExtend;
use memecanon::config::SubCommand;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Hash(config) => config.run(&opts).await,
        SubCommand::Derive(config) => config.run(&opts).await,
        SubCommand::Register(config) => config.run(&opts).await,
        SubCommand::Lookup(config) => config.run(&opts).await,
        SubCommand::Scan(config) => config.run(&opts).await,
        SubCommand::Server(config) => config.run(&opts).await,
    }
}

use clap::Parser;
use redikv::config::Config;
use redikv::{server, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::parse();

    server::run(config).await
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chainfs::{FileDisk, FileSystem, Server};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Serve a chainfs volume over a line-based TCP protocol")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 12345)]
    port: u16,

    /// Backing file of the volume, created if missing and re-formatted on every start
    #[arg(short, long, default_value = "filesystem.dat")]
    disk: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let disk = FileDisk::open(&args.disk)
        .with_context(|| format!("failed to open backing file {}", args.disk.display()))?;
    let fs = FileSystem::format(disk)
        .with_context(|| format!("failed to format {}", args.disk.display()))?;
    log::info!("{}", fs.dump());

    let server = Server::bind((args.host.as_str(), args.port), Arc::new(fs))
        .with_context(|| format!("failed to start server on port {}", args.port))?;
    server.run()?;
    Ok(())
}

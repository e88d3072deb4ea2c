use clap::Parser;
use log::error;
use server::network::Server;
use server::quiz::TopicCatalog;
use server::registry::SharedRegistry;
use shared::MAX_PLAYERS;
use std::sync::Arc;

/// Multiplayer trivia quiz server.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Directory holding topics.txt and the per-topic quiz files
    #[clap(short, long, default_value = "topics")]
    topics: String,
    /// Maximum number of concurrently registered players
    #[clap(short, long, default_value_t = MAX_PLAYERS)]
    max_players: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let catalog = Arc::new(TopicCatalog::load(&args.topics)?);
    if catalog.is_empty() {
        error!(
            "No topics found in {}; connecting clients will be turned away",
            args.topics
        );
    }
    let registry = SharedRegistry::new(args.max_players, catalog.len());

    let addr = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&addr, registry, catalog).await?;
    server.run().await?;

    Ok(())
}

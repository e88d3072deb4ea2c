use clap::Parser;
use client::connection::Connection;
use client::session;

/// Terminal client for the multiplayer trivia quiz.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server host to connect to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port
    #[clap(short, long, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let addr = format!("{}:{}", args.host, args.port);
    println!("=== TRIVIA QUIZ ===");
    println!("Connecting to {}...", addr);

    let mut conn = Connection::connect(&addr).await?;
    println!("Connected.");

    session::run_session(&mut conn).await?;
    Ok(())
}

//! Polls a JWKS endpoint and prints the key ids it currently serves.
//!
//! cargo run --example rotate -- https://www.googleapis.com/oauth2/v3/certs

use std::time::Duration;

use starberry_jwks::KeyRotator;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let endpoint = std::env::args()
        .nth(1)
        .ok_or("usage: rotate <jwks-url>")?;

    let rotator = KeyRotator::connect(endpoint).await?;
    rotator.start_rotation(Duration::from_secs(30));

    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let keys = rotator.read_key_map();
                let mut kids: Vec<_> = keys.keys().map(|kid| kid.to_string()).collect();
                kids.sort();
                println!("{} keys: {}", kids.len(), kids.join(", "));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    rotator.shutdown().await;
    Ok(())
}

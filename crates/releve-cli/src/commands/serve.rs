//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16) -> Result<()> {
    let config = releve_server::ServerConfig::from_env();

    println!("🚀 Starting Releve web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if config.allowed_origins.is_empty() {
        println!("   CORS: same-origin only (set RELEVE_ALLOWED_ORIGINS to allow others)");
    } else {
        println!("   CORS origins: {}", config.allowed_origins.join(", "));
    }
    println!(
        "   Max upload: {} MB",
        config.max_upload_bytes / 1024 / 1024
    );
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path)?;
    releve_server::serve(db, host, port, config).await?;

    Ok(())
}

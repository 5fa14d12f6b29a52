/*
 * Responsibility
 * - tokio runtime start
 * - app::run() (no logic here)
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    path_auth::app::run().await
}

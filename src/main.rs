#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = attempt_engine::run().await {
        eprintln!("attempt-engine fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

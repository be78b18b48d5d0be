#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = attempt_engine::run_worker().await {
        eprintln!("attempt-engine-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = redpen::run_worker().await {
        eprintln!("redpen-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

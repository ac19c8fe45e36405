#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = redpen::run().await {
        eprintln!("redpen fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

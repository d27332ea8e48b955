#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = results_portal::run().await {
        eprintln!("results-portal fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

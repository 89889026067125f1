#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = bureau_exam_client::run().await {
        eprintln!("bureau-exam-client fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

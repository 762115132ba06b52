#[tokio::main]
async fn main() {
    if let Err(e) = vigila::run().await {
        eprintln!("vigila failed to start: {e}");
        std::process::exit(1);
    }
}

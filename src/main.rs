#[tokio::main]
async fn main() -> anyhow::Result<()> {
    asin_categorizer_lib::cli::run().await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    iplocbuild_cli::main().await
}

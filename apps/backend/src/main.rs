#[tokio::main]
async fn main() -> anyhow::Result<()> {
    conspecto_backend::run().await
}

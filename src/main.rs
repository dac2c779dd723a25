use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    veritext::run().await
}

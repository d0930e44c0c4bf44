use std::io::Result;

#[tokio::main]
async fn main() -> Result<()> {
    koth_server::frameworks::server::run_with_config().await
}

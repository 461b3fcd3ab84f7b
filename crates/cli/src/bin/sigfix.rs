use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    sigfix_cli::main_entry().await
}

//! HVAC Site Backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hvac_site_backend::run().await
}

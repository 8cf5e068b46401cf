//! Admin account helper.
//!
//!   create-admin <USERNAME> <PASSWORD> [EMAIL]   insert into DATABASE_URL
//!   create-admin --hash <PASSWORD>               print a hash for ADMIN_PASSWORD_HASH

use anyhow::{bail, Context};
use hvac_site_backend::{
    auth::local,
    db::{self, DbConfig},
    storage::PgStorage,
};

const USAGE: &str = "Usage: create-admin <USERNAME> <PASSWORD> [EMAIL]\n       create-admin --hash <PASSWORD>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [flag, password] if flag == "--hash" => {
            let hashed = local::hash_password(password.clone()).await?;
            println!("\nCost     : {}", local::BCRYPT_COST);
            println!("Hash     : {}\n", hashed);
            println!("# Paste this into your .env:");
            println!("ADMIN_PASSWORD_HASH={}", hashed);
            Ok(())
        }
        [username, password] => create(username, password, None).await,
        [username, password, email] => create(username, password, Some(email.clone())).await,
        _ => bail!(USAGE),
    }
}

async fn create(username: &str, password: &str, email: Option<String>) -> anyhow::Result<()> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let config = DbConfig::new(url);
    let pool = db::init_pool(&config)
        .await
        .with_context(|| format!("could not connect to {}", config.redacted_url()))?;
    db::run_migrations(&pool).await.context("database migrations failed")?;

    let storage = PgStorage::new(pool);
    let admin = local::create_admin(&storage, username, password, email).await?;
    println!("Created admin {:?} (id {})", admin.username, admin.id);
    Ok(())
}

//! Development token issuer for Billtrack
//!
//! Signs a bearer token with `JWT_SECRET` so the API can be exercised
//! locally without an identity provider.
//!
//! Usage:
//!   cargo run --bin issue-token
//!   cargo run --bin issue-token <user-uuid> [email]

use std::env;

use billtrack_api::auth::JwtManager;
use time::Duration;
use uuid::Uuid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET is not set")?;
    let user_id = match env::args().nth(1) {
        Some(raw) => Uuid::parse_str(&raw)?,
        None => Uuid::new_v4(),
    };
    let email = env::args().nth(2);

    let token = JwtManager::new(&secret).issue_token(user_id, email.as_deref(), Duration::days(7))?;

    println!("User ID: {}", user_id);
    println!("Token (valid 7 days):");
    println!("{}", token);
    println!("\nExample:");
    println!("curl -H 'Authorization: Bearer {}' http://localhost:3000/api/invoices", token);

    Ok(())
}

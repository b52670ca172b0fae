use homevideo::application_impl::Argon2PasswordHasher;
use homevideo::application_port::CredentialHasher;

/// Prints an Argon2 PHC string for `auth.password_hash`.
///
/// $ cargo run --bin hash_password -- 'correct horse battery staple'
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(password) = std::env::args().nth(1) else {
        anyhow::bail!("usage: hash_password <password>");
    };
    if password.is_empty() {
        anyhow::bail!("refusing to hash an empty password");
    }

    let hash = Argon2PasswordHasher.hash_password(&password).await?;
    println!("{}", hash);
    Ok(())
}

use crate::auth::backends::htpasswd;
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug)]
pub struct Args {
    /// Read from stdin when `None`.
    pub password: Option<SecretString>,
}

/// Print the argon2 PHC string for the password, ready for a `user:hash` line.
/// # Errors
/// Returns an error if stdin can't be read, the password is empty or hashing fails.
pub async fn execute(args: Args) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => read_stdin_line().await?,
    };
    if password.expose_secret().is_empty() {
        return Err(anyhow!("empty password"));
    }

    let hash = tokio::task::spawn_blocking(move || {
        htpasswd::hash_password(password.expose_secret())
    })
    .await
    .context("password hashing task failed")??;

    println!("{hash}");

    Ok(())
}

async fn read_stdin_line() -> Result<SecretString> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read password from stdin")?;
    Ok(SecretString::from(
        line.trim_end_matches(['\r', '\n']).to_string(),
    ))
}

//! Local sign-in / sign-up against the credential file.
//!
//! Authentication is entirely client-side: the server never sees a
//! credential. Secrets are obscured (not hashed) on disk — see the cipher
//! module docs in parley-core.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, Lines};

use parley_core::credentials::CredentialStore;

use crate::ui;

/// Run the interactive sign-in or sign-up flow until it succeeds.
pub async fn authenticate<R>(lines: &mut Lines<R>, store: &CredentialStore) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        ui::prompt("Do you want to sign in or sign up? (1/2): ");
        match read_line(lines).await?.as_str() {
            "1" => return sign_in(lines, store).await,
            "2" => return sign_up(lines, store).await,
            _ => println!("Invalid choice. Enter '1' to sign in or '2' to sign up."),
        }
    }
}

async fn sign_in<R>(lines: &mut Lines<R>, store: &CredentialStore) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        ui::prompt("Username: ");
        let username = read_line(lines).await?;
        ui::prompt("Password: ");
        let password = read_line(lines).await?;

        if store.verify(&username, &password)? {
            println!("Login successful.");
            return Ok(());
        }
        println!("Invalid username or password. Please try again.");
    }
}

async fn sign_up<R>(lines: &mut Lines<R>, store: &CredentialStore) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let username = loop {
        ui::prompt("Username: ");
        let username = read_line(lines).await?;
        if username.is_empty() {
            println!("Username may not be empty.");
        } else if store.exists(&username)? {
            println!("User already exists. Please choose a different username.");
        } else {
            break username;
        }
    };

    ui::prompt("Password: ");
    let password = read_line(lines).await?;

    store.register(&username, &password)?;
    println!("User successfully registered.");
    Ok(())
}

async fn read_line<R>(lines: &mut Lines<R>) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let line = lines
        .next_line()
        .await
        .context("failed to read stdin")?
        .context("stdin closed")?;
    Ok(line.trim().to_string())
}

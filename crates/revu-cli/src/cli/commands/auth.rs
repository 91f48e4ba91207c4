//! Sign-in and sign-out from the command line.

use anyhow::Result;
use revu_core::auth::{AuthClient, oauth};
use revu_core::config::Config;

pub async fn login(config: &Config, paste: Option<String>) -> Result<()> {
    let client = AuthClient::new(config.auth.clone());

    if let Some(input) = paste {
        oauth::write_redirect_callback(&input)?;
        return match client.pending_redirect_result().await {
            Ok(Some(session)) => {
                println!("Welcome {}!", session.display_name_or_default());
                Ok(())
            }
            Ok(None) => {
                println!("No redirect sign-in was pending.");
                Ok(())
            }
            Err(err) => anyhow::bail!("Sign-in failed: {err}"),
        };
    }

    match client.sign_in_interactive().await {
        Ok(session) => {
            println!("Welcome {}!", session.display_name_or_default());
            Ok(())
        }
        Err(err) if err.is_recoverable() => {
            let url = client
                .sign_in_via_redirect()
                .map_err(|e| anyhow::anyhow!("Sign-in failed: {e}"))?;
            println!("Complete the sign-in in your browser:");
            println!("  {url}");
            println!("then finish with: revu login --paste <redirected-url>");
            Ok(())
        }
        Err(err) => anyhow::bail!("Sign-in failed: {err}"),
    }
}

pub fn logout(config: &Config) -> Result<()> {
    let client = AuthClient::new(config.auth.clone());
    client.sign_out();
    println!("Signed out.");
    Ok(())
}

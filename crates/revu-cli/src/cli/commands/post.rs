//! One-shot review submission.
//!
//! Runs the same four gates as the wall. Local gates are checked before
//! any challenge is spent: a draft that would fail on length never
//! reaches the verification service.

use std::io::{self, Write};

use anyhow::{Context, Result};
use revu_core::auth::AuthClient;
use revu_core::captcha::{CaptchaClient, CaptchaWidget};
use revu_core::config::Config;
use revu_core::moderation::ProfanityFilter;
use revu_core::review::Review;
use revu_core::store::StoreClient;
use revu_core::validate::{ValidationError, validate_submission};

pub async fn run(config: &Config, text: &str, captcha_token: Option<&str>) -> Result<()> {
    let filter = ProfanityFilter::new();
    let mut widget = CaptchaWidget::default();
    if let Some(token) = captcha_token {
        widget.set_token(token.to_string());
    }

    let trimmed = match validate_submission(text, widget.response_token(), &filter) {
        Ok(trimmed) => trimmed,
        Err(ValidationError::CaptchaMissing) if captcha_token.is_none() => {
            let token = run_challenge(config).await?;
            widget.set_token(token);
            validate_submission(text, widget.response_token(), &filter)
                .map_err(|gate| anyhow::anyhow!("{gate}"))?
        }
        Err(gate) => anyhow::bail!("{gate}"),
    };

    let auth = AuthClient::new(config.auth.clone());
    let user = auth.current().and_then(|session| session.display_name);

    let store = StoreClient::new(&config.store);
    let review = Review::new(trimmed, user.as_deref());
    let key = store.append(&review).await?;

    tracing::info!("Review stored under {key}");
    println!("Posted as {}.", review.user);
    Ok(())
}

/// Runs the bot-check challenge on the terminal.
async fn run_challenge(config: &Config) -> Result<String> {
    let client = CaptchaClient::new(&config.captcha);
    let challenge = client.challenge().await?;

    println!("{}", challenge.prompt);
    print!("> ");
    io::stdout().flush().context("flush stdout")?;

    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .context("read challenge answer")?;

    client.verify(&challenge.id, answer.trim()).await
}

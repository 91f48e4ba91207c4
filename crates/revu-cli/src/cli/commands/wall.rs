//! One-shot wall listing.

use anyhow::Result;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use revu_core::config::Config;
use revu_core::review::project_feed;
use revu_core::store::StoreClient;

pub async fn run(config: &Config, limit: Option<usize>) -> Result<()> {
    let store = StoreClient::new(&config.store);
    let snapshot = store.fetch().await?;
    let reviews = project_feed(snapshot.as_ref());

    if reviews.is_empty() {
        println!("No reviews yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["When", "User", "Review"]);

    for review in reviews.iter().take(limit.unwrap_or(usize::MAX)) {
        let when = chrono::DateTime::from_timestamp_millis(review.timestamp)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| review.timestamp.to_string());
        table.add_row([when.as_str(), review.user.as_str(), review.text.as_str()]);
    }

    println!("{table}");
    Ok(())
}

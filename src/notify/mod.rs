pub mod telegram;

pub use telegram::TelegramNotifier;

use crate::models::{DetailRecord, Details};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Telegram rejects longer messages
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Delivers newly found listings to a person
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, found: &Details) -> Result<()>;
}

/// Message text for one listing, cut to [`MAX_MESSAGE_CHARS`]
pub fn format_message(id: &str, record: &DetailRecord) -> String {
    let text = format!("New property found {}\n{}", id, record);
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text;
    }
    text.chars().take(MAX_MESSAGE_CHARS).collect()
}

/// Used when no Telegram token is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, found: &Details) -> Result<()> {
        for (id, record) in found {
            info!("{}", format_message(id, record));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CompleteDetails;

    #[test]
    fn message_lists_known_fields() {
        let record = DetailRecord::Complete(CompleteDetails::new(
            "https://www.immoweb.be/en/classified/10921373",
            Some(300_000),
            Some("Rue Haute 1, 1000 Brussels".to_string()),
            Some(2),
            None,
        ));
        let text = format_message("10921373", &record);
        assert!(text.starts_with("New property found 10921373\nAddress: Rue Haute 1, 1000 Brussels\n"));
        assert!(text.contains("Area: unknown m²"));
        assert!(!text.contains("Price per m²"));
        assert!(text.ends_with("https://www.immoweb.be/en/classified/10921373"));
    }

    #[test]
    fn bare_record_is_just_the_url() {
        assert_eq!(format_message("7", &DetailRecord::bare("u7")), "New property found 7\nu7");
    }

    #[test]
    fn long_messages_are_truncated_on_char_boundaries() {
        let url = format!("https://example.com/{}", "€".repeat(5000));
        let text = format_message("1", &DetailRecord::bare(url));
        assert_eq!(text.chars().count(), MAX_MESSAGE_CHARS);
    }
}

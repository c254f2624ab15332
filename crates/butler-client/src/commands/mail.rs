//! Mail report.

use std::io::Write;

use butler_core::{Message, NO_MESSAGES_TEXT, ReportFormatter, render, resolve_label_ids};
use butler_providers::MailSource;
use tracing::{debug, warn};

use crate::error::ClientResult;

/// Prints up to `max_results` messages carrying every label in `label_names`.
///
/// Names that match no label are skipped with a warning. If none match,
/// nothing is listed and the empty report is printed. Returns the number of
/// messages shown.
pub async fn report(
    source: &dyn MailSource,
    label_names: &[String],
    max_results: u32,
    formatter: &ReportFormatter,
    out: &mut dyn Write,
) -> ClientResult<usize> {
    let messages = fetch(source, label_names, max_results).await?;
    let blocks = formatter.format_mail(&messages);
    out.write_all(render(&blocks, NO_MESSAGES_TEXT).as_bytes())?;
    out.flush()?;
    Ok(messages.len())
}

async fn fetch(
    source: &dyn MailSource,
    label_names: &[String],
    max_results: u32,
) -> ClientResult<Vec<Message>> {
    let labels = source.list_labels().await?;
    let label_ids = resolve_label_ids(label_names, &labels);

    for name in label_names {
        if !labels.iter().any(|label| &label.name == name) {
            warn!("no label named {:?}, skipping it", name);
        }
    }
    if label_ids.is_empty() {
        debug!("no label resolved, nothing to list");
        return Ok(Vec::new());
    }

    let ids = source.list_messages(&label_ids, max_results).await?;
    debug!("{} messages listed from {}", ids.len(), source.name());

    let mut messages = Vec::with_capacity(ids.len());
    for id in &ids {
        messages.push(source.get_message(id).await?);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fakes::FakeMailbox;
    use butler_core::ReportOptions;
    use butler_providers::ProviderErrorCode;

    fn plain() -> ReportFormatter {
        ReportFormatter::new(ReportOptions {
            color: false,
            ..Default::default()
        })
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn run(mailbox: &FakeMailbox, labels: &[&str], max: u32) -> (usize, String) {
        let mut out = Vec::new();
        let count = report(mailbox, &names(labels), max, &plain(), &mut out)
            .await
            .unwrap();
        (count, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn one_unread_message() {
        let (count, out) = run(&FakeMailbox::two_messages(), &["UNREAD"], 1).await;
        assert_eq!(count, 1);
        insta::assert_snapshot!(out.trim(), @r"
        Subject: Quarterly numbers
        Sender: Alice <alice@example.com>
        ");
    }

    #[tokio::test]
    async fn return_path_sender_is_the_domain() {
        let (count, out) = run(&FakeMailbox::two_messages(), &["Work"], 10).await;
        assert_eq!(count, 1);
        assert!(out.contains("Subject: Deploy finished\nSender: ci.example.com\n"));
    }

    #[tokio::test]
    async fn max_results_bounds_the_listing() {
        let mailbox = FakeMailbox::two_messages();
        let (count, _) = run(&mailbox, &["INBOX"], 1).await;
        assert_eq!(count, 1);
        let (count, _) = run(&mailbox, &["INBOX"], 10).await;
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn unknown_label_is_skipped() {
        let mailbox = FakeMailbox::two_messages();
        let (count, _) = run(&mailbox, &["UNREAD", "BOGUS"], 10).await;
        assert_eq!(count, 1);
        assert_eq!(mailbox.listed_with(), vec![names(&["L_UNREAD"])]);
    }

    #[tokio::test]
    async fn no_resolved_label_lists_nothing() {
        let mailbox = FakeMailbox::two_messages();
        let (count, out) = run(&mailbox, &["BOGUS"], 10).await;
        assert_eq!(count, 0);
        assert_eq!(out, "No messages found.\n");
        assert!(mailbox.listed_with().is_empty());
    }

    #[tokio::test]
    async fn message_fetch_failure_is_fatal() {
        let mailbox = FakeMailbox::two_messages().failing_on("m1");
        let mut out = Vec::new();
        let err = report(&mailbox, &names(&["UNREAD"]), 10, &plain(), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ClientError::Provider(ref e) if e.code() == ProviderErrorCode::NotFound
        ));
        assert!(out.is_empty());
    }
}

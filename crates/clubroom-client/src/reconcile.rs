//! Pure merge logic folding a single remote child event into an ordered
//! message collection.
//!
//! All three operations preserve the collection invariants: ascending sort
//! by send timestamp (stable, so equal timestamps keep arrival order) and
//! identifier uniqueness.  Each is idempotent under repeated application
//! of the same event.

use clubroom_shared::ChatMessage;

/// Merge an "added" event: replace in place when the identifier already
/// exists, otherwise insert and re-sort.
pub fn merge_added(messages: &mut Vec<ChatMessage>, incoming: ChatMessage) {
    match messages
        .iter_mut()
        .find(|m| m.message_id == incoming.message_id)
    {
        Some(existing) => *existing = incoming,
        None => messages.push(incoming),
    }
    sort_by_date(messages);
}

/// Merge a "changed" event: replace by identifier.
///
/// A changed event for an identifier not present locally is treated as an
/// implicit add — it usually means the corresponding added event was
/// missed or raced past the subscription cursor.
pub fn merge_changed(messages: &mut Vec<ChatMessage>, incoming: ChatMessage) {
    merge_added(messages, incoming);
}

/// Merge a "removed" event: drop the entry with the matching identifier.
/// No-op if absent.
pub fn merge_removed(messages: &mut Vec<ChatMessage>, message_id: &str) {
    messages.retain(|m| m.message_id != message_id);
}

fn sort_by_date(messages: &mut [ChatMessage]) {
    // Vec::sort_by is stable: same-timestamp messages keep arrival order.
    messages.sort_by(|a, b| a.date.total_cmp(&b.date));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubroom_shared::UserId;

    fn msg(id: &str, date: f64) -> ChatMessage {
        ChatMessage {
            message_id: id.to_string(),
            message: format!("body {id}"),
            sender: UserId::from("alice"),
            date,
            last_updated: None,
            thread_name: None,
            reply_to: None,
            attachment_url: None,
            reactions: None,
            flagged: None,
            system_generated: None,
        }
    }

    fn ids(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.message_id.as_str()).collect()
    }

    #[test]
    fn merge_added_is_idempotent() {
        let mut once = vec![msg("a", 100.0)];
        merge_added(&mut once, msg("b", 200.0));

        let mut twice = once.clone();
        merge_added(&mut twice, msg("b", 200.0));

        assert_eq!(once, twice);
    }

    #[test]
    fn merge_keeps_ascending_sort() {
        let mut messages = Vec::new();
        for (id, date) in [("c", 300.0), ("a", 100.0), ("d", 400.0), ("b", 200.0)] {
            merge_added(&mut messages, msg(id, date));
        }
        assert_eq!(ids(&messages), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn duplicate_identifier_overwrites_never_duplicates() {
        let mut messages = vec![msg("a", 100.0), msg("b", 200.0)];

        let mut edited = msg("a", 100.0);
        edited.message = "edited".into();
        merge_added(&mut messages, edited);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message, "edited");
    }

    #[test]
    fn changed_for_unknown_id_is_implicit_add() {
        let mut messages = vec![msg("a", 100.0)];
        merge_changed(&mut messages, msg("b", 50.0));
        assert_eq!(ids(&messages), vec!["b", "a"]);
    }

    #[test]
    fn removed_drops_entry_and_tolerates_absence() {
        let mut messages = vec![msg("a", 100.0), msg("b", 200.0)];

        merge_removed(&mut messages, "a");
        assert_eq!(ids(&messages), vec!["b"]);

        merge_removed(&mut messages, "a");
        assert_eq!(ids(&messages), vec!["b"]);
    }

    #[test]
    fn out_of_order_arrival_sorts_by_timestamp() {
        // Arrival order 105, 95 (slipped past the cursor), 110: the sort
        // invariant dominates arrival order.
        let mut messages = Vec::new();
        merge_added(&mut messages, msg("m105", 105.0));
        merge_added(&mut messages, msg("m95", 95.0));
        merge_added(&mut messages, msg("m110", 110.0));

        assert_eq!(ids(&messages), vec!["m95", "m105", "m110"]);
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let mut messages = Vec::new();
        merge_added(&mut messages, msg("first", 100.0));
        merge_added(&mut messages, msg("second", 100.0));
        merge_added(&mut messages, msg("third", 100.0));

        assert_eq!(ids(&messages), vec!["first", "second", "third"]);
    }
}

//! Token counting and history fitting.
//!
//! Counts use the `cl100k_base` encoding. Exact counts for other model
//! families differ somewhat, which is acceptable for budgeting.

use crate::messages::{Message, MessageRole};
use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

/// Approximate tokens for role markers and message framing.
const MESSAGE_OVERHEAD: usize = 4;

fn encoder() -> Option<&'static CoreBPE> {
    static ENCODER: OnceLock<Option<CoreBPE>> = OnceLock::new();
    ENCODER
        .get_or_init(|| match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(e) => {
                tracing::warn!(error = %e, "tokenizer unavailable; estimating token counts");
                None
            }
        })
        .as_ref()
}

/// Counts the tokens in `text`.
///
/// Falls back to a four-characters-per-token estimate if the encoder
/// cannot be loaded.
#[must_use]
pub fn count_tokens(text: &str) -> usize {
    match encoder() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => text.chars().count().div_ceil(4),
    }
}

/// Counts the tokens a message contributes to a prompt.
#[must_use]
pub fn message_tokens(message: &Message) -> usize {
    let calls: usize = message
        .tool_calls
        .iter()
        .flatten()
        .map(|call| count_tokens(&call.name) + count_tokens(&call.arguments))
        .sum();
    count_tokens(&message.content) + calls + MESSAGE_OVERHEAD
}

/// Counts the tokens of a whole message list.
#[must_use]
pub fn history_tokens(messages: &[Message]) -> usize {
    messages.iter().map(message_tokens).sum()
}

/// Returns the most recent suffix of `history` that fits in `budget` tokens.
///
/// The suffix always starts at a user message, so an assistant tool-call
/// message is never separated from the tool results that answer it. When
/// even the newest turn does not fit, the result is empty.
#[must_use]
pub fn fit_history(history: &[Message], budget: usize) -> &[Message] {
    let mut used = 0;
    let mut start = history.len();
    let mut turn_tokens = 0;

    for (i, message) in history.iter().enumerate().rev() {
        turn_tokens += message_tokens(message);
        if message.role == MessageRole::User {
            if used + turn_tokens > budget {
                break;
            }
            used += turn_tokens;
            turn_tokens = 0;
            start = i;
        }
    }

    if start < history.len() {
        tracing::trace!(
            dropped = start,
            kept = history.len() - start,
            tokens = used,
            "fitted history to token budget"
        );
    }
    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ToolCall;

    #[test]
    fn counts_are_positive_and_grow() {
        let short = count_tokens("hello");
        let long = count_tokens("hello world, this is a much longer sentence");
        assert!(short > 0);
        assert!(long > short);
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn message_tokens_include_overhead_and_calls() {
        let plain = Message::assistant("");
        assert_eq!(message_tokens(&plain), MESSAGE_OVERHEAD);

        let with_call = Message::assistant_with_tools(
            "",
            vec![ToolCall::new("c1", "read_file", r#"{"file_path":"a.py"}"#)],
        );
        assert!(message_tokens(&with_call) > MESSAGE_OVERHEAD);
    }

    fn tool_turn(n: usize) -> Vec<Message> {
        vec![
            Message::user(format!("question {n}")),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new(format!("c{n}"), "list_directory", "{}")],
            ),
            Message::tool(format!("c{n}"), "{\"status\":\"success\"}"),
            Message::assistant(format!("answer {n}")),
        ]
    }

    #[test]
    fn everything_fits_under_large_budget() {
        let history: Vec<_> = (0..3).flat_map(tool_turn).collect();
        assert_eq!(fit_history(&history, 100_000).len(), history.len());
    }

    #[test]
    fn trimming_keeps_whole_turns() {
        let history: Vec<_> = (0..3).flat_map(tool_turn).collect();
        let one_turn = history_tokens(&history[8..]);

        let kept = fit_history(&history, one_turn + 1);

        assert_eq!(kept.len(), 4);
        assert_eq!(kept[0].role, MessageRole::User);
        assert_eq!(kept[0].content, "question 2");
    }

    #[test]
    fn tiny_budget_keeps_nothing() {
        let history = tool_turn(0);
        assert!(fit_history(&history, 1).is_empty());
    }
}

//! Character-window chunking.

/// Splits `text` into chunks of at most `size` characters.
///
/// Consecutive chunks share `overlap` characters. Inside each window the
/// cut prefers, in order, a blank line, a line break, then a space, as long
/// as that break falls in the second half of the window; otherwise the
/// window is cut at exactly `size` characters. Whitespace-only chunks are
/// dropped.
///
/// `overlap` is clamped below `size` so the window always advances.
#[must_use]
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let overlap = overlap.min(size - 1);
    let chars: Vec<char> = text.chars().collect();

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let hard_end = (start + size).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            split_point(&chars, start + size / 2, hard_end).unwrap_or(hard_end)
        };

        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
}

/// Finds the preferred cut in `chars[from..to]`, returning the index just
/// past the separator.
fn split_point(chars: &[char], from: usize, to: usize) -> Option<usize> {
    let window = from..to;

    let paragraph = window
        .clone()
        .rev()
        .find(|&i| i + 1 < to && chars[i] == '\n' && chars[i + 1] == '\n')
        .map(|i| i + 2);
    paragraph
        .or_else(|| window.clone().rev().find(|&i| chars[i] == '\n').map(|i| i + 1))
        .or_else(|| window.rev().find(|&i| chars[i] == ' ').map(|i| i + 1))
}

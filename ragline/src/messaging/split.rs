//! Splitting model output into platform-sized reply messages.

/// Marker appended to the last message when text had to be dropped.
const ELLIPSIS: char = '…';

/// Split a reply into at most `max_messages` chunks of at most `max_chars`
/// characters each.
///
/// Chunks break on line boundaries where possible. A single line longer than
/// `max_chars` is hard-split on character boundaries. When the text needs
/// more than `max_messages` chunks, the extra text is dropped and the last
/// kept chunk ends with an ellipsis. Blank input yields no chunks.
#[must_use]
pub fn split_reply(text: &str, max_chars: usize, max_messages: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_chars == 0 || max_messages == 0 {
        return Vec::new();
    }

    let mut chunks = split_into_chunks(text, max_chars);
    if chunks.len() > max_messages {
        chunks.truncate(max_messages);
        if let Some(last) = chunks.last_mut() {
            mark_truncated(last, max_chars);
        }
    }
    chunks
}

fn mark_truncated(chunk: &mut String, max_chars: usize) {
    if chunk.chars().count() >= max_chars {
        *chunk = chunk.chars().take(max_chars.saturating_sub(1)).collect();
    }
    chunk.push(ELLIPSIS);
}

fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = line.chars().count();

        if line_len > max_chars {
            flush(&mut chunks, std::mem::take(&mut current));
            let chars: Vec<char> = line.chars().collect();
            let mut pieces = chars.chunks(max_chars).peekable();
            while let Some(piece) = pieces.next() {
                let piece: String = piece.iter().collect();
                if pieces.peek().is_some() {
                    flush(&mut chunks, piece);
                } else {
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
            continue;
        }

        let new_len = if current.is_empty() {
            line_len
        } else {
            current_len + 1 + line_len
        };

        if new_len > max_chars {
            flush(&mut chunks, std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    flush(&mut chunks, current);
    chunks
}

/// Whitespace-only chunks would waste a message slot and are rejected by LINE.
fn flush(chunks: &mut Vec<String>, chunk: String) {
    if !chunk.trim().is_empty() {
        chunks.push(chunk);
    }
}

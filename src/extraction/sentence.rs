use super::tree::{DocumentTree, Selection};

/// Characters that can end a sentence when followed by whitespace.
pub const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// How far either scan may move away from the selection start.
pub const MAX_SCAN_CHARS: usize = 500;

fn is_terminator(ch: char) -> bool {
    SENTENCE_TERMINATORS.contains(&ch)
}

fn ends_sentence(text: &[char], index: usize) -> bool {
    text.get(index).copied().is_some_and(is_terminator)
        && text.get(index + 1).copied().is_some_and(char::is_whitespace)
}

/// The sentence around the first range of `selection`, or `None` when the
/// selection has no range or its start cannot be located in the tree.
///
/// The sentence is cut from the nearest block-level ancestor's text. Both
/// scans stop after [`MAX_SCAN_CHARS`], so unpunctuated text yields a bounded
/// window instead of the whole container.
pub fn extract_sentence<T: DocumentTree>(
    tree: &T,
    selection: &Selection<T::Node>,
) -> Option<String> {
    let range = selection.range_at(0)?;

    let mut container = tree.common_ancestor(range.start.node, range.end.node)?;
    while let Some(parent) = tree.parent(container) {
        if !tree.is_text(container) && tree.display(container).is_paragraph_boundary() {
            break;
        }
        container = parent;
    }

    let full_text: Vec<char> = tree.text_content(container).chars().collect();
    let selection_index = tree.text_offset(container, range.start)?.min(full_text.len());
    let selection_len = range.text.chars().count();

    let start = scan_backward(&full_text, selection_index);
    let end = scan_forward(&full_text, selection_index, selection_len);

    let sentence: String = full_text[start..end].iter().collect();
    Some(sentence.trim().to_string())
}

fn scan_backward(text: &[char], selection_index: usize) -> usize {
    let mut start = selection_index;
    while start > 0 {
        if is_terminator(text[start - 1]) && text.get(start).copied().is_some_and(char::is_whitespace)
        {
            break;
        }
        if selection_index - start >= MAX_SCAN_CHARS {
            break;
        }
        start -= 1;
    }
    start
}

fn scan_forward(text: &[char], selection_index: usize, selection_len: usize) -> usize {
    let mut end = (selection_index + selection_len).min(text.len());
    while end < text.len() {
        if ends_sentence(text, end) {
            break;
        }
        if end - selection_index >= MAX_SCAN_CHARS {
            break;
        }
        end += 1;
    }
    // Keep the terminator the scan stopped on. A terminator that is the last
    // character is already included because the loop runs to `text.len()`.
    if end < text.len() && is_terminator(text[end]) {
        end += 1;
    }
    end
}

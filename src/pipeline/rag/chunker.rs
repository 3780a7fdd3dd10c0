/// Maximum characters per chunk.
const MAX_CHUNK_CHARS: usize = 800;

/// Chunks shorter than this merge into their neighbor.
const MIN_CHUNK_CHARS: usize = 40;

/// Split text into retrieval chunks: paragraph-first, with oversized
/// paragraphs split on line boundaries and undersized fragments merged.
pub fn chunk_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if paragraph.len() <= MAX_CHUNK_CHARS {
            chunks.push(paragraph.to_string());
        } else {
            chunks.extend(split_long_paragraph(paragraph));
        }
    }

    merge_tiny_chunks(chunks)
}

fn split_long_paragraph(paragraph: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for line in paragraph.lines() {
        if !current.is_empty() && current.len() + line.len() + 1 > MAX_CHUNK_CHARS {
            pieces.push(current.trim().to_string());
            current = String::new();
        }
        // A single line longer than the budget is split at char boundaries
        if line.len() > MAX_CHUNK_CHARS {
            let mut rest: Vec<char> = line.chars().collect();
            while rest.len() > MAX_CHUNK_CHARS {
                let head: String = rest.drain(..MAX_CHUNK_CHARS).collect();
                pieces.push(head);
            }
            current.push_str(&rest.into_iter().collect::<String>());
        } else {
            current.push_str(line);
        }
        current.push('\n');
    }

    if !current.trim().is_empty() {
        pieces.push(current.trim().to_string());
    }
    pieces
}

fn merge_tiny_chunks(chunks: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for chunk in chunks {
        if chunk.len() < MIN_CHUNK_CHARS {
            if let Some(last) = merged.last_mut() {
                last.push('\n');
                last.push_str(&chunk);
                continue;
            }
        }
        merged.push(chunk);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_become_chunks() {
        let text = "First paragraph about schedule risks and mitigation planning.\n\nSecond paragraph about vendor spend and quarterly burn rate detail.";
        let chunks = chunk_text(text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("schedule risks"));
    }

    #[test]
    fn long_paragraphs_are_split() {
        let line = "a schedule slip was reported in the integration workstream. ";
        let text = line.repeat(30);
        let chunks = chunk_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX_CHUNK_CHARS + 1);
        }
    }

    #[test]
    fn tiny_fragments_merge_into_neighbors() {
        let text = "A full paragraph describing the current delivery posture in detail.\n\nok";
        let chunks = chunk_text(text);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].ends_with("ok"));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("").is_empty());
        assert!(chunk_text("\n\n\n").is_empty());
    }
}

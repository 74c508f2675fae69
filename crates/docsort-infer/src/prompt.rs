//! Prompt construction for classification and summarization.

use docsort_core::UNCATEGORIZED;
use docsort_store::HistoryEntry;

/// Truncate `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the prompt asking for exactly one category name.
///
/// `history` is injected as weak examples of earlier decisions; callers cap
/// its length. `max_content_chars` bounds the document excerpt.
pub fn build_classification_prompt(
    content: &str,
    categories: &[String],
    history: &[HistoryEntry],
    max_content_chars: usize,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("# Task\n");
    prompt.push_str(
        "Categorize the provided document (often German) into exactly one of the \
         categories listed below.\n",
    );
    prompt.push_str(&format!(
        "Answer with the category name only, spelled exactly as listed, without any \
         explanation or additional text. If no category fits, answer {}.\n\n",
        UNCATEGORIZED
    ));

    if !history.is_empty() {
        prompt.push_str("# Previously filed documents\n");
        prompt.push_str(
            "For reference only; earlier documents and the category they were filed under.\n",
        );
        for entry in history {
            prompt.push_str(&format!(
                "- {}: {}\n",
                entry.category,
                entry.summary.trim().replace('\n', " ")
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str("# Categories\n");
    for name in categories {
        prompt.push_str(name);
        prompt.push('\n');
    }
    prompt.push('\n');

    prompt.push_str("# Document Content\n");
    prompt.push_str(truncate_chars(content, max_content_chars));
    prompt.push_str("\n\n");

    prompt.push_str("# Instruction\n");
    prompt.push_str(&format!(
        "Respond with exactly one category name from the list above. If none matches, \
         respond with {}.\n",
        UNCATEGORIZED
    ));

    prompt
}

/// Build the prompt asking for a summary of `sentence_count` sentences that
/// keeps every date found in the document.
pub fn build_summary_prompt(content: &str, sentence_count: usize, max_content_chars: usize) -> String {
    let sentences = if sentence_count == 1 {
        "exactly 1 sentence".to_string()
    } else {
        format!("exactly {} sentences", sentence_count)
    };

    format!(
        "# Task\n\
         Summarize the following document in {sentences}. \
         Preserve every date that appears in the document exactly as written. \
         Write the summary in the language of the document and respond with the \
         summary only.\n\n\
         # Document Content\n\
         {content}\n",
        sentences = sentences,
        content = truncate_chars(content, max_content_chars),
    )
}

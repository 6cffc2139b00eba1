use crate::normalize::ContentBlock;

pub const WORDS_PER_MINUTE: usize = 200;

/// Estimated minutes to read a post.
///
/// Each block is rounded up on its own and the results summed, so a post with
/// many short blocks reads longer than its total word count alone suggests.
pub fn reading_time(content: &[ContentBlock]) -> usize {
    content.iter().map(block_minutes).sum()
}

fn block_minutes(block: &ContentBlock) -> usize {
    word_count(block).div_ceil(WORDS_PER_MINUTE)
}

/// Words in a block: its runs' text joined by single spaces, split on `' '`.
///
/// No separator is added while the joined text is still empty. Consecutive
/// spaces count as extra (empty) words and an empty block counts as one word.
fn word_count(block: &ContentBlock) -> usize {
    let mut text = String::new();
    for run in &block.body {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&run.text);
    }
    text.split(' ').count()
}

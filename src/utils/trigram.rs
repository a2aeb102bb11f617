use crate::index::types::{bytes_to_trigram, Trigram};

/// Minimum literal length that yields at least one trigram
pub const MIN_TRIGRAM_LEN: usize = 3;

/// Extract unique, sorted trigrams from content
pub fn extract_trigrams(content: &[u8]) -> Vec<Trigram> {
    if content.len() < MIN_TRIGRAM_LEN {
        return Vec::new();
    }

    let mut trigrams: Vec<Trigram> = content
        .windows(3)
        .map(|w| bytes_to_trigram(w[0], w[1], w[2]))
        .collect();
    trigrams.sort_unstable();
    trigrams.dedup();
    trigrams
}

/// Literal runs of a shell glob that are long enough to narrow by trigram.
///
/// Wildcards (`*`, `?`) and bracketed character classes split runs; runs
/// shorter than three characters are dropped.
pub fn glob_literal_runs(glob: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut chars = glob.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '*' | '?' => flush_run(&mut current, &mut runs),
            '[' => {
                flush_run(&mut current, &mut runs);
                // Skip the class body, including a leading ']' or '!'
                let mut first = true;
                for inner in chars.by_ref() {
                    if inner == ']' && !first {
                        break;
                    }
                    first = false;
                }
            }
            _ => current.push(ch),
        }
    }
    flush_run(&mut current, &mut runs);
    runs
}

fn flush_run(current: &mut String, runs: &mut Vec<String>) {
    if current.chars().count() >= MIN_TRIGRAM_LEN {
        runs.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Check if content appears to be binary (not text)
pub fn is_binary(content: &[u8]) -> bool {
    let sample_size = content.len().min(8192);
    let sample = &content[..sample_size];

    // Check for null bytes
    let null_count = sample.iter().filter(|&&b| b == 0).count();
    if null_count > sample_size / 10 {
        return true;
    }

    // Check for high proportion of non-text bytes
    let non_text_count = sample
        .iter()
        .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
        .count();

    non_text_count > sample_size / 8
}

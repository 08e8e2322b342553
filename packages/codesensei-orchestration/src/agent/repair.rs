//! Response text cleanup
//!
//! [`strip_code_fences`] removes a Markdown fence around a response.
//! [`repair_truncated_json`] rebalances text that was cut off mid-document:
//!
//! 1. a trailing unescaped backslash is dropped
//! 2. an odd number of unescaped `"` means the text ends inside a string, so
//!    one closing quote is appended
//! 3. a scan outside strings pushes a closer for every `{`/`[` and pops on a
//!    matching close; the leftover closers are appended innermost first
//!
//! The result is syntactically balanced, not necessarily what the truncated
//! document meant. A dangling key or trailing comma still fails to parse.

const FENCE: &str = "```";

/// Strip a surrounding Markdown code fence (with optional language tag).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let body = match rest.rfind(FENCE) {
        Some(end) => &rest[..end],
        // Truncated before the closing fence
        None => rest,
    };
    body.trim()
}

pub fn repair_truncated_json(text: &str) -> String {
    let mut repaired = text.to_string();

    if trailing_backslashes(&repaired) % 2 == 1 {
        repaired.pop();
    }

    if count_unescaped_quotes(&repaired) % 2 == 1 {
        repaired.push('"');
    }

    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in repaired.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.last() == Some(&c) {
                    closers.pop();
                }
            }
            _ => {}
        }
    }

    repaired.extend(closers.into_iter().rev());
    repaired
}

fn trailing_backslashes(text: &str) -> usize {
    text.chars().rev().take_while(|c| *c == '\\').count()
}

/// Quotes not preceded by an odd run of backslashes.
fn count_unescaped_quotes(text: &str) -> usize {
    let mut count = 0;
    let mut run = 0;
    for c in text.chars() {
        match c {
            '\\' => run += 1,
            '"' => {
                if run % 2 == 0 {
                    count += 1;
                }
                run = 0;
            }
            _ => run = 0,
        }
    }
    count
}

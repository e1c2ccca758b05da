//! Markup neutralization for user supplied text (display names, chat bodies).
//!
//! Never fails: executable blocks are dropped, every other markup character is
//! escaped so the text renders literally.

const DROPPED_BLOCKS: [&str; 2] = ["script", "style"];

pub fn sanitize(input: &str) -> String {
    escape(&strip_blocks(input))
}

/// Removes `<script>`/`<style>` elements including their content. An element
/// that is never closed swallows the rest of the input.
fn strip_blocks(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;

    while cursor < input.len() {
        let next = DROPPED_BLOCKS
            .iter()
            .filter_map(|tag| find_tag(&lower, cursor, &format!("<{tag}")).map(|at| (at, *tag)))
            .min_by_key(|(at, _)| *at);

        let Some((start, tag)) = next else {
            out.push_str(&input[cursor..]);
            break;
        };

        out.push_str(&input[cursor..start]);
        cursor = match find_tag(&lower, start, &format!("</{tag}")) {
            Some(close_start) => match lower[close_start..].find('>') {
                Some(gt) => close_start + gt + 1,
                None => input.len(),
            },
            None => input.len(),
        };
    }

    out
}

/// Byte offset of the first `open` at or after `from` that is a whole tag
/// name: followed by whitespace, `>`, `/` or the end of input.
fn find_tag(lower: &str, from: usize, open: &str) -> Option<usize> {
    let mut search = from;
    while let Some(at) = lower[search..].find(open) {
        let start = search + at;
        let after = start + open.len();
        match lower[after..].chars().next() {
            None => return Some(start),
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => return Some(start),
            Some(_) => search = after,
        }
    }
    None
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

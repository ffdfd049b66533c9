//! Pure string transforms shared by processors and templates.
//!
//! Every function here is referentially transparent (except [`exec`], which
//! runs an external command) and operates on borrowed input. The template
//! layer ([`crate::template`]) exposes each of these under a fixed callable
//! name (`hash`, `truncate`, `excerpt`, …) so page templates can invoke them
//! inline; processors call them directly.
//!
//! # Hashing
//!
//! [`hash`] is the content-addressing primitive behind cache-busting version
//! tags. It is SHA-256 truncated to [`HASH_WIDTH`] hex characters: stable
//! across runs and platforms, wide enough that collisions are a non-issue for
//! a site-sized page set, short enough to keep `?v=` query strings readable.
//! Truncation is fine here — the hash gates CDN cache invalidation, it is not
//! a security boundary.

use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use regex::Regex;

/// Width (in hex characters) of the content hash used for version tags.
pub const HASH_WIDTH: usize = 8;

/// Marker appended by [`excerpt`] when text was cut short.
const EXCERPT_MARKER: &str = " [...]";

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new("<[^>]+>").unwrap());

/// Deterministic content hash: SHA-256, lowercase hex, truncated to
/// [`HASH_WIDTH`] characters.
pub fn hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(HASH_WIDTH);
    hex
}

/// Truncate `value` to at most `length` characters.
///
/// The length is clamped to the input, so this never panics on short input,
/// and it counts `char`s rather than bytes so multi-byte text is never split
/// mid-codepoint.
pub fn truncate(length: usize, value: &str) -> String {
    match value.char_indices().nth(length) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

/// Remove anything between angle brackets.
///
/// Deliberately naive — this is a tag stripper for excerpts and plain-text
/// feeds, not an HTML parser.
pub fn strip_html(value: &str) -> String {
    HTML_TAG.replace_all(value, "").into_owned()
}

/// Remove all `\r` and `\n` characters.
pub fn strip_newlines(value: &str) -> String {
    value.replace(['\r', '\n'], "")
}

/// Replace every occurrence of `old` with `new`.
pub fn replace(old: &str, new: &str, value: &str) -> String {
    value.replace(old, new)
}

/// Replace up to `n` occurrences of `old` with `new`. Negative `n` means
/// unbounded.
pub fn replacen(old: &str, new: &str, n: i64, value: &str) -> String {
    if n < 0 {
        value.replace(old, new)
    } else {
        value.replacen(old, new, n as usize)
    }
}

/// Split `value` on `sep`.
pub fn split(sep: &str, value: &str) -> Vec<String> {
    value.split(sep).map(str::to_string).collect()
}

/// True if `needle` occurs within `value`.
pub fn contains(needle: &str, value: &str) -> bool {
    value.contains(needle)
}

/// Trim leading and trailing spaces and tabs (other whitespace is kept).
pub fn chomp(value: &str) -> String {
    value.trim_matches([' ', '\t']).to_string()
}

/// Cut the substring strictly between the first match of `begin` and the
/// first match of `end`, both compiled as regexes.
///
/// A missing begin-match anchors the cut at position 0; a missing end-match
/// anchors it at the input length. A pattern that fails to compile is a
/// recoverable error for the caller.
pub fn cut(begin: &str, end: &str, value: &str) -> Result<String, regex::Error> {
    let bre = Regex::new(begin)?;
    let ere = Regex::new(end)?;

    let start = bre.find(value).map_or(0, |m| m.end());
    let stop = ere.find(value).map_or(value.len(), |m| m.start());

    if start >= stop {
        return Ok(String::new());
    }
    Ok(value[start..stop].to_string())
}

/// Truncate `text` to at most `max_words` space-delimited words.
///
/// - `max_words <= 0` returns the empty string.
/// - If the text has no more words than requested, it is returned unchanged
///   (no marker).
/// - Otherwise the first N words are joined and a ` [...]` marker appended.
pub fn excerpt(text: &str, max_words: i64) -> String {
    if max_words <= 0 {
        return String::new();
    }
    let words: Vec<&str> = text.split(' ').collect();
    if max_words as usize >= words.len() {
        return text.to_string();
    }
    let mut out = words[..max_words as usize].join(" ");
    out.push_str(EXCERPT_MARKER);
    out
}

/// Render markdown to HTML. Treated as a black-box text transform.
pub fn markdown(text: &str) -> String {
    let parser = pulldown_cmark::Parser::new(text);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

/// Run an external command, returning combined stdout+stderr.
///
/// A non-zero exit status is an error (the combined output is included in
/// the message so build logs show what the command said).
pub fn exec(cmd: &str, args: &[String]) -> io::Result<String> {
    let out = Command::new(cmd).args(args).output()?;
    let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&out.stderr));
    if !out.status.success() {
        return Err(io::Error::other(format!(
            "{cmd} exited with {}: {combined}",
            out.status
        )));
    }
    Ok(combined)
}

/// Filter `input` through an external command's stdin/stdout.
///
/// Used by the `external` processor. Stdin is fed from a separate thread so
/// large pages can't deadlock against a full pipe buffer.
pub fn filter_through(cmd: &str, args: &[String], input: &str) -> io::Result<String> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("child stdin unavailable"))?;
    let bytes = input.as_bytes().to_vec();
    let writer = std::thread::spawn(move || stdin.write_all(&bytes));

    let mut stdout = String::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_string(&mut stdout)?;
    }
    let status = child.wait()?;
    writer.join().map_err(|_| io::Error::other("stdin writer panicked"))??;

    if !status.success() {
        let mut stderr = String::new();
        if let Some(mut err) = child.stderr.take() {
            err.read_to_string(&mut stderr).ok();
        }
        return Err(io::Error::other(format!(
            "{cmd} exited with {status}: {}",
            stderr.trim_end()
        )));
    }
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // hash
    // =========================================================================

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash("hello"), hash("hello"));
    }

    #[test]
    fn hash_is_fixed_width_lowercase_hex() {
        let h = hash("anything at all");
        assert_eq!(h.len(), HASH_WIDTH);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_changes_with_content() {
        assert_ne!(hash("version 1"), hash("version 2"));
    }

    // =========================================================================
    // truncate
    // =========================================================================

    #[test]
    fn truncate_clamps_to_input_length() {
        assert_eq!(truncate(100, "short"), "short");
    }

    #[test]
    fn truncate_cuts_at_length() {
        assert_eq!(truncate(3, "abcdef"), "abc");
    }

    #[test]
    fn truncate_zero() {
        assert_eq!(truncate(0, "abc"), "");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate(2, "héllo"), "hé");
    }

    // =========================================================================
    // strip_html / strip_newlines / chomp
    // =========================================================================

    #[test]
    fn strip_html_removes_tags() {
        assert_eq!(strip_html("<p>hi <b>there</b></p>"), "hi there");
    }

    #[test]
    fn strip_html_leaves_plain_text() {
        assert_eq!(strip_html("no tags here"), "no tags here");
    }

    #[test]
    fn strip_newlines_removes_cr_and_lf() {
        assert_eq!(strip_newlines("a\r\nb\nc"), "abc");
    }

    #[test]
    fn chomp_trims_spaces_and_tabs_only() {
        assert_eq!(chomp(" \thello \t"), "hello");
        assert_eq!(chomp("\nhello\n"), "\nhello\n");
    }

    // =========================================================================
    // replace / replacen / split / contains
    // =========================================================================

    #[test]
    fn replace_is_unbounded() {
        assert_eq!(replace("a", "b", "aaa"), "bbb");
    }

    #[test]
    fn replacen_bounded() {
        assert_eq!(replacen("a", "b", 2, "aaa"), "bba");
    }

    #[test]
    fn replacen_negative_is_unbounded() {
        assert_eq!(replacen("a", "b", -1, "aaa"), "bbb");
    }

    #[test]
    fn split_on_separator() {
        assert_eq!(split(",", "a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn contains_substring() {
        assert!(contains("ell", "hello"));
        assert!(!contains("xyz", "hello"));
    }

    // =========================================================================
    // cut
    // =========================================================================

    #[test]
    fn cut_between_markers() {
        let out = cut("<!--start-->", "<!--end-->", "before<!--start-->middle<!--end-->after");
        assert_eq!(out.unwrap(), "middle");
    }

    #[test]
    fn cut_missing_begin_starts_at_zero() {
        assert_eq!(cut("NOPE", "mid", "start middle").unwrap(), "start ");
    }

    #[test]
    fn cut_missing_end_runs_to_input_length() {
        assert_eq!(cut("start ", "NOPE", "start middle").unwrap(), "middle");
    }

    #[test]
    fn cut_bad_pattern_is_an_error() {
        assert!(cut("[", "end", "value").is_err());
        assert!(cut("begin", "[", "value").is_err());
    }

    #[test]
    fn cut_inverted_markers_yield_empty() {
        assert_eq!(cut("end", "start", "start end x").unwrap(), "");
    }

    // =========================================================================
    // excerpt
    // =========================================================================

    #[test]
    fn excerpt_zero_or_negative_is_empty() {
        assert_eq!(excerpt("some words here", 0), "");
        assert_eq!(excerpt("some words here", -3), "");
    }

    #[test]
    fn excerpt_enough_words_returns_input_unchanged() {
        let text = "The quick brown fox jumps, over the lazy dog.";
        assert_eq!(excerpt(text, 9), text);
        assert_eq!(excerpt(text, 999), text);
    }

    #[test]
    fn excerpt_cuts_and_marks() {
        let text = "The quick brown fox jumps, over the lazy dog.";
        assert_eq!(excerpt(text, 1), "The [...]");
        assert_eq!(excerpt(text, 3), "The quick brown [...]");
        assert_eq!(excerpt(text, 4), "The quick brown fox [...]");
    }

    // =========================================================================
    // markdown / exec
    // =========================================================================

    #[test]
    fn markdown_renders_emphasis() {
        let html = markdown("*hi*");
        assert!(html.contains("<em>hi</em>"));
    }

    #[test]
    fn exec_combines_output() {
        let out = exec("sh", &["-c".into(), "echo out; echo err >&2".into()]).unwrap();
        assert!(out.contains("out"));
        assert!(out.contains("err"));
    }

    #[test]
    fn exec_nonzero_status_is_an_error() {
        assert!(exec("sh", &["-c".into(), "exit 3".into()]).is_err());
    }

    #[test]
    fn filter_through_pipes_content() {
        let out = filter_through("tr", &["a-z".into(), "A-Z".into()], "hello").unwrap();
        assert_eq!(out, "HELLO");
    }
}

//! Produce the new `CLAUDE.md` text for a chosen [`Resolution`].
//!
//! The bundle content always lands in a *managed block*:
//!
//! ```text
//! <user content>
//!
//! ---
//! <!-- rigger:begin sha256=0123456789abcdef -->
//! <bundle content>
//! <!-- rigger:end -->
//! ```
//!
//! A later run finds the block and refreshes it in place instead of
//! appending a second copy. `replace` additionally turns each conflicting
//! region into an HTML comment; the user's bytes stay in the file.

use std::ops::RangeInclusive;

use sha2::{Digest, Sha256};

use super::Resolution;
use super::detector::{ConflictReport, PREVIOUS_SETUP, is_block_begin};

/// Horizontal rule placed before an appended block.
pub const SEPARATOR: &str = "---";
/// Start of the managed block's opening marker line.
pub const BLOCK_BEGIN_PREFIX: &str = "<!-- rigger:begin";
/// The managed block's closing marker line.
pub const BLOCK_END: &str = "<!-- rigger:end -->";

const SUPERSEDED_BEGIN: &str = "<!-- rigger:superseded";
const SUPERSEDED_END: &str = "rigger:superseded-end -->";

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Leave the file as it is (or absent).
    Unchanged,
    /// Write this text as the entire file.
    Write(String),
}

/// Short SHA-256 fingerprint of the bundle content, stored in the begin marker.
pub fn content_fingerprint(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(&digest[..8])
}

/// Marker-wrapped content, without the leading separator.
fn block_body(content: &str) -> String {
    let mut out = format!(
        "{BLOCK_BEGIN_PREFIX} sha256={} -->\n",
        content_fingerprint(content)
    );
    out.push_str(content);
    if !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(BLOCK_END);
    out.push('\n');
    out
}

/// The exact text appended to `existing` by a `merge`: a separator (unless
/// `existing` is empty) followed by the marker-wrapped content.
pub fn managed_block(existing: &str, content: &str) -> String {
    let mut out = String::new();
    if !existing.is_empty() {
        if !existing.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
        out.push_str(SEPARATOR);
        out.push('\n');
    }
    out.push_str(&block_body(content));
    out
}

/// A managed block found in a document, by 0-based line index.
#[derive(Debug, Clone)]
struct BlockSpan {
    lines: RangeInclusive<usize>,
    fingerprint: Option<String>,
}

/// Whether `line` is a managed block's closing marker.
fn is_block_end(line: &str) -> bool {
    line.trim()
        .strip_prefix("<!--")
        .and_then(|rest| rest.strip_suffix("-->"))
        .is_some_and(|inner| inner.trim().eq_ignore_ascii_case("rigger:end"))
}

/// The first complete managed block. An end marker closes the nearest begin
/// marker above it, so an orphaned begin never swallows the user lines
/// between it and a later block.
fn find_block(lines: &[&str]) -> Option<BlockSpan> {
    let mut open: Option<usize> = None;
    for (i, line) in lines.iter().enumerate() {
        if is_block_begin(line) {
            open = Some(i);
        } else if let Some(begin) = open
            && is_block_end(line)
        {
            let fingerprint = lines[begin].split("sha256=").nth(1).map(|rest| {
                rest.chars()
                    .take_while(|c| c.is_ascii_hexdigit())
                    .collect::<String>()
            });
            return Some(BlockSpan {
                lines: begin..=i,
                fingerprint,
            });
        }
    }
    None
}

/// Per line: whether it starts outside any HTML comment and neither opens
/// nor closes one. Only such lines can be wrapped in a comment without the
/// comment ending early.
fn wrappable_lines(lines: &[&str]) -> Vec<bool> {
    let mut in_comment = false;
    lines
        .iter()
        .map(|line| {
            let clean = !in_comment && !line.contains("<!--") && !line.contains("-->");
            let mut rest = *line;
            loop {
                let marker = if in_comment { "-->" } else { "<!--" };
                match rest.find(marker) {
                    Some(at) => {
                        rest = &rest[at + marker.len()..];
                        in_comment = !in_comment;
                    }
                    None => break,
                }
            }
            clean
        })
        .collect()
}

/// Line spans already commented out by an earlier `replace`.
fn superseded_spans(lines: &[&str]) -> Vec<RangeInclusive<usize>> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    for (i, line) in lines.iter().enumerate() {
        if open.is_none() && line.trim_start().starts_with(SUPERSEDED_BEGIN) {
            open = Some(i);
        } else if let Some(start) = open
            && line.trim_end().ends_with(SUPERSEDED_END)
        {
            spans.push(start..=i);
            open = None;
        }
    }
    spans
}

/// A region to comment out: 0-based inclusive line range plus pattern ids.
#[derive(Debug)]
struct Region {
    start: usize,
    end: usize,
    ids: Vec<String>,
}

/// Conflict regions for `replace`, clipped away from the managed block,
/// minus anything already superseded, coalesced when they touch, then split
/// around lines that cannot sit inside a comment.
fn conflict_regions(
    report: &ConflictReport,
    lines: &[&str],
    block: Option<&BlockSpan>,
    superseded: &[RangeInclusive<usize>],
) -> Vec<Region> {
    let line_count = lines.len();
    let mut regions: Vec<Region> = Vec::new();

    for m in report.iter() {
        if m.pattern_id == PREVIOUS_SETUP || m.line == 0 || m.line > line_count {
            continue;
        }
        let hit = m.line - 1;
        if superseded.iter().any(|s| s.contains(&hit)) {
            continue;
        }

        let mut start = m.start_line.saturating_sub(1).min(hit);
        let mut end = m.end_line.saturating_sub(1).clamp(hit, line_count - 1);

        if let Some(block) = block {
            if block.lines.contains(&hit) {
                continue;
            }
            if block.lines.contains(&start) {
                start = block.lines.end() + 1;
            }
            if block.lines.contains(&end) {
                end = block.lines.start().saturating_sub(1);
            }
        }
        // Never split an earlier superseded span.
        for s in superseded {
            if s.contains(&start) {
                start = s.end() + 1;
            }
            if s.contains(&end) {
                end = s.start().saturating_sub(1);
            }
        }

        if start > end {
            continue;
        }
        regions.push(Region {
            start,
            end,
            ids: vec![m.pattern_id.clone()],
        });
    }

    regions.sort_by_key(|r| r.start);

    let mut merged: Vec<Region> = Vec::with_capacity(regions.len());
    for region in regions {
        match merged.last_mut() {
            Some(last) if region.start <= last.end + 1 => {
                last.end = last.end.max(region.end);
                last.ids.extend(region.ids);
            }
            _ => merged.push(region),
        }
    }

    let wrappable = wrappable_lines(lines);
    let mut pieces: Vec<Region> = Vec::with_capacity(merged.len());
    for region in merged {
        let mut run: Option<usize> = None;
        for i in region.start..=region.end {
            match (wrappable[i], run) {
                (true, None) => run = Some(i),
                (false, Some(start)) => {
                    pieces.push(Region {
                        start,
                        end: i - 1,
                        ids: region.ids.clone(),
                    });
                    run = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run {
            pieces.push(Region {
                start,
                end: region.end,
                ids: region.ids,
            });
        }
    }
    pieces
}

/// Compute the new document text.
///
/// - `document` is `None` when the file does not exist. An absent or blank
///   document gets `content` verbatim for `merge` and `replace`.
/// - `merge` appends a managed block, or refreshes the existing one.
/// - `replace` comments out each conflict region first, then does the same.
/// - `skip` never changes anything.
///
/// Returns [`Resolved::Unchanged`] whenever the computed text equals the
/// current one, so repeated runs do not rewrite the file.
pub fn resolve(
    document: Option<&str>,
    report: &ConflictReport,
    resolution: Resolution,
    content: &str,
) -> Resolved {
    if resolution == Resolution::Skip {
        return Resolved::Unchanged;
    }

    let doc = match document {
        Some(d) if !d.trim().is_empty() => d,
        Some(d) if d == content => return Resolved::Unchanged,
        _ => return Resolved::Write(content.to_string()),
    };
    if doc.trim_end() == content.trim_end() {
        return Resolved::Unchanged;
    }

    let lines: Vec<&str> = doc.split_inclusive('\n').collect();
    let block = find_block(&lines);
    let keep_block = block
        .as_ref()
        .and_then(|b| b.fingerprint.as_deref())
        .is_some_and(|fp| fp == content_fingerprint(content));

    let regions = match resolution {
        Resolution::Replace => {
            conflict_regions(report, &lines, block.as_ref(), &superseded_spans(&lines))
        }
        _ => Vec::new(),
    };

    let mut out = String::with_capacity(doc.len() + content.len() + 128);
    let mut next_region = regions.iter().peekable();
    let mut open_region: Option<&Region> = None;

    for (i, line) in lines.iter().enumerate() {
        if let Some(b) = &block
            && b.lines.contains(&i)
        {
            if keep_block {
                out.push_str(line);
            } else if i == *b.lines.start() {
                out.push_str(&block_body(content));
            }
            continue;
        }

        if let Some(region) = next_region.next_if(|r| r.start == i) {
            out.push_str(SUPERSEDED_BEGIN);
            out.push(' ');
            out.push_str(&region.ids.join(", "));
            out.push('\n');
            open_region = Some(region);
        }

        out.push_str(line);

        if open_region.is_some_and(|r| r.end == i) {
            if !line.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(SUPERSEDED_END);
            out.push('\n');
            open_region = None;
        }
    }

    if block.is_none() {
        let appended = managed_block(&out, content);
        out.push_str(&appended);
    }

    if out == doc {
        Resolved::Unchanged
    } else {
        Resolved::Write(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::detect;

    const CONTENT: &str = "# Bundle\n\n## Model Tiering\n- haiku: search\n";

    fn write_text(r: Resolved) -> String {
        match r {
            Resolved::Write(s) => s,
            Resolved::Unchanged => panic!("expected a write, got Unchanged"),
        }
    }

    #[test]
    fn fingerprint_is_sixteen_hex_chars() {
        let fp = content_fingerprint(CONTENT);
        assert_eq!(fp.len(), 16);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(fp, content_fingerprint("other"));
    }

    #[test]
    fn missing_document_gets_content_verbatim() {
        let report = ConflictReport::default();
        for resolution in [Resolution::Merge, Resolution::Replace] {
            let out = write_text(resolve(None, &report, resolution, CONTENT));
            assert_eq!(out, CONTENT);
        }
    }

    #[test]
    fn blank_document_gets_content_verbatim() {
        let out = write_text(resolve(
            Some("\n\n"),
            &ConflictReport::default(),
            Resolution::Merge,
            CONTENT,
        ));
        assert_eq!(out, CONTENT);
    }

    #[test]
    fn skip_never_writes() {
        let doc = "## Model Tiering\nmine\n";
        assert_eq!(
            resolve(Some(doc), &detect(doc), Resolution::Skip, CONTENT),
            Resolved::Unchanged
        );
        assert_eq!(
            resolve(None, &ConflictReport::default(), Resolution::Skip, CONTENT),
            Resolved::Unchanged
        );
    }

    #[test]
    fn merge_appends_without_touching_existing_lines() {
        let doc = "# Mine\n\nkeep me\n";
        let report = detect(doc);
        assert!(report.is_empty());

        let out = write_text(resolve(Some(doc), &report, Resolution::Merge, CONTENT));
        assert!(out.starts_with(doc));
        assert_eq!(out.len(), doc.len() + managed_block(doc, CONTENT).len());
        assert!(out.contains("\n---\n<!-- rigger:begin sha256="));
        assert!(out.ends_with("<!-- rigger:end -->\n"));
    }

    #[test]
    fn merge_handles_missing_trailing_newline() {
        let doc = "# Mine";
        let out = write_text(resolve(
            Some(doc),
            &ConflictReport::default(),
            Resolution::Merge,
            CONTENT,
        ));
        assert!(out.starts_with("# Mine\n\n---\n"));
    }

    #[test]
    fn merge_twice_keeps_a_single_block() {
        let doc = "# Mine\n";
        let once = write_text(resolve(
            Some(doc),
            &ConflictReport::default(),
            Resolution::Merge,
            CONTENT,
        ));
        let again = resolve(Some(&once), &detect(&once), Resolution::Merge, CONTENT);
        assert_eq!(again, Resolved::Unchanged);
    }

    #[test]
    fn merge_refreshes_stale_block_in_place() {
        let doc = "# Mine\n";
        let old = write_text(resolve(
            Some(doc),
            &ConflictReport::default(),
            Resolution::Merge,
            "old bundle\n",
        ));
        let tail = "\n## Later notes\nafter\n";
        let edited = format!("{old}{tail}");

        let out = write_text(resolve(
            Some(&edited),
            &detect(&edited),
            Resolution::Merge,
            CONTENT,
        ));
        assert_eq!(out.matches(BLOCK_BEGIN_PREFIX).count(), 1);
        assert!(!out.contains("old bundle"));
        assert!(out.contains("- haiku: search"));
        assert!(out.starts_with("# Mine\n\n---\n"));
        assert!(out.ends_with(tail), "text after the block must survive");
    }

    #[test]
    fn replace_wraps_conflicts_and_keeps_bytes() {
        let doc = "# Mine\nintro\n## Model Tiering\nuse opus everywhere\n\n## Other\nx\n";
        let report = detect(doc);
        let out = write_text(resolve(Some(doc), &report, Resolution::Replace, CONTENT));

        for line in doc.lines() {
            assert!(out.contains(line), "original line {line:?} missing");
        }
        let expected_prefix = "# Mine\n\
             <!-- rigger:superseded model_tiering\n\
             intro\n\
             ## Model Tiering\n\
             use opus everywhere\n\
             rigger:superseded-end -->\n\
             \n\
             ## Other\n";
        assert!(out.starts_with(expected_prefix), "got:\n{out}");
        assert!(out.contains(BLOCK_END));
    }

    #[test]
    fn replace_coalesces_adjacent_regions() {
        let doc = "## Model Tiering\n## Orchestration\nbody\n";
        let out = write_text(resolve(
            Some(doc),
            &detect(doc),
            Resolution::Replace,
            CONTENT,
        ));
        assert_eq!(out.matches(SUPERSEDED_BEGIN).count(), 1);
        assert!(out.starts_with("<!-- rigger:superseded model_tiering, orchestration\n"));
    }

    #[test]
    fn replace_is_idempotent() {
        let doc = "## Model Tiering\nuse opus\n\nother\n";
        let once = write_text(resolve(
            Some(doc),
            &detect(doc),
            Resolution::Replace,
            CONTENT,
        ));
        let again = resolve(Some(&once), &detect(&once), Resolution::Replace, CONTENT);
        assert_eq!(again, Resolved::Unchanged);
    }

    #[test]
    fn replace_ignores_matches_inside_managed_block() {
        let doc = "# Mine\n";
        let merged = write_text(resolve(
            Some(doc),
            &ConflictReport::default(),
            Resolution::Merge,
            CONTENT,
        ));
        let report = detect(&merged);
        assert!(report.get("model_tiering").is_some());

        assert_eq!(
            resolve(Some(&merged), &report, Resolution::Replace, CONTENT),
            Resolved::Unchanged
        );
    }

    #[test]
    fn orphaned_begin_marker_never_swallows_user_text() {
        let doc = "# Mine\n<!-- rigger:begin sha256=0000000000000000 -->\nMY PRECIOUS NOTES\n";
        let once = write_text(resolve(Some(doc), &detect(doc), Resolution::Merge, CONTENT));
        assert!(once.starts_with(doc));

        assert_eq!(
            resolve(Some(&once), &detect(&once), Resolution::Merge, CONTENT),
            Resolved::Unchanged
        );

        let refreshed = write_text(resolve(
            Some(&once),
            &detect(&once),
            Resolution::Merge,
            "new bundle\n",
        ));
        assert!(refreshed.starts_with(doc), "got:\n{refreshed}");
        assert!(refreshed.contains("new bundle"));
        assert!(!refreshed.contains("- haiku: search"));
        assert_eq!(refreshed.matches(BLOCK_END).count(), 1);
    }

    #[test]
    fn block_with_unspaced_markers_is_recognised() {
        let doc = format!(
            "# Mine\n\n---\n<!--rigger:begin sha256={} -->\n{CONTENT}<!--rigger:end-->\n",
            content_fingerprint(CONTENT)
        );
        let report = detect(&doc);
        assert!(report.has_previous_setup());
        assert_eq!(
            resolve(Some(&doc), &report, Resolution::Merge, CONTENT),
            Resolved::Unchanged
        );
    }

    #[test]
    fn replace_keeps_lines_with_comment_markers_outside_the_wrap() {
        let doc = "intro <!-- note -->\n## Model Tiering\nuse opus\n";
        let out = write_text(resolve(Some(doc), &detect(doc), Resolution::Replace, CONTENT));
        assert!(
            out.starts_with(
                "intro <!-- note -->\n\
                 <!-- rigger:superseded model_tiering\n\
                 ## Model Tiering\n\
                 use opus\n\
                 rigger:superseded-end -->\n"
            ),
            "got:\n{out}"
        );
        assert_eq!(
            resolve(Some(&out), &detect(&out), Resolution::Replace, CONTENT),
            Resolved::Unchanged
        );
    }

    #[test]
    fn replace_leaves_sections_inside_a_user_comment_alone() {
        let doc = "<!-- draft\n## Model Tiering\nold -->\nlive\n";
        let out = write_text(resolve(Some(doc), &detect(doc), Resolution::Replace, CONTENT));
        assert!(out.starts_with(doc));
        assert!(!out.contains(SUPERSEDED_BEGIN));
    }

    #[test]
    fn document_equal_to_content_is_unchanged() {
        assert_eq!(
            resolve(Some(CONTENT), &detect(CONTENT), Resolution::Merge, CONTENT),
            Resolved::Unchanged
        );
    }
}

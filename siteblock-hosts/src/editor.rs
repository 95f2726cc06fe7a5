//! Pure text transforms over hosts-file content.
//!
//! ## Managed block layout
//!
//! ```text
//! <blank line>
//! # Website Blocker - Umar J
//! 127.0.0.1 example.com
//! 127.0.0.1 www.example.com
//! ```
//!
//! [`apply`] appends such a block holding only the entries that are not
//! already present as exact lines. [`revert`] removes blocks it recognizes by
//! the marker line. Nothing outside the block is touched.
//!
//! Removal matches domains as substrings of the lines inside a block, so an
//! unrelated host inside a block that contains a blocked domain is removed
//! too, and entries for domains no longer in the list are left behind.

use std::collections::HashSet;

use similar::TextDiff;

use siteblock_core::Domain;

/// Comment line that opens every managed block. Must match byte-for-byte.
pub const MARKER: &str = "# Website Blocker - Umar J";

/// Address every blocked name is pointed at.
pub const BLOCK_ADDRESS: &str = "127.0.0.1";

/// The two entries (bare and `www.`) for every domain, in list order.
pub fn block_entries(domains: &[Domain]) -> Vec<String> {
    domains
        .iter()
        .flat_map(|d| {
            [
                format!("{BLOCK_ADDRESS} {d}"),
                format!("{BLOCK_ADDRESS} {}", d.www()),
            ]
        })
        .collect()
}

/// Append a managed block with every entry missing from `current`.
///
/// Idempotent: when all entries are already present the input is returned
/// unchanged.
pub fn apply(current: &str, domains: &[Domain]) -> String {
    let present: HashSet<&str> = current.lines().collect();
    let missing: Vec<String> = block_entries(domains)
        .into_iter()
        .filter(|entry| !present.contains(entry.as_str()))
        .collect();
    if missing.is_empty() {
        return current.to_string();
    }

    let eol = line_ending(current);
    let mut out = String::with_capacity(current.len() + missing.len() * 32 + MARKER.len() + 4);
    out.push_str(current);
    if !current.is_empty() && !current.ends_with('\n') {
        out.push_str(eol);
    }
    out.push_str(eol);
    out.push_str(MARKER);
    out.push_str(eol);
    for entry in missing {
        out.push_str(&entry);
        out.push_str(eol);
    }
    out
}

/// Remove managed blocks for `domains`.
///
/// A marker line opens a block and is dropped together with the blank
/// separator line directly before it. Inside a block, lines containing a
/// domain are dropped, a blank line closes the block (and is dropped), and
/// any other line closes the block and is kept.
pub fn revert(current: &str, domains: &[Domain]) -> String {
    let mut out = String::with_capacity(current.len());
    let mut in_block = false;
    let mut pending_blank: Option<&str> = None;

    for line in current.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);

        if content == MARKER {
            pending_blank = None;
            in_block = true;
            continue;
        }

        if in_block {
            if domains.iter().any(|d| content.contains(d.as_str())) {
                continue;
            }
            in_block = false;
            if content.trim().is_empty() {
                continue;
            }
        }

        if let Some(blank) = pending_blank.take() {
            out.push_str(blank);
        }
        if content.trim().is_empty() {
            pending_blank = Some(line);
        } else {
            out.push_str(line);
        }
    }

    if let Some(blank) = pending_blank {
        out.push_str(blank);
    }
    out
}

/// Revert for `previous`, then apply `current`; used when the block list
/// changes while blocking is active.
pub fn resync(text: &str, previous: &[Domain], current: &[Domain]) -> String {
    apply(&revert(text, previous), current)
}

/// Whether `text` contains a marker line.
pub fn contains_managed_block(text: &str) -> bool {
    text.lines().any(|line| line == MARKER)
}

/// Unified diff from `current` to `desired`; empty when they are equal.
pub fn preview(current: &str, desired: &str, label: &str) -> String {
    if current == desired {
        return String::new();
    }
    TextDiff::from_lines(current, desired)
        .unified_diff()
        .header(&format!("a/{label}"), &format!("b/{label}"))
        .context_radius(3)
        .to_string()
}

fn line_ending(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

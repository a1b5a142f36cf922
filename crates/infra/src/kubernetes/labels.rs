// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DNS-subdomain sanitization for generated names and user-supplied labels.
//!
//! Kubernetes object names must match `[a-z0-9]([-a-z0-9]*[a-z0-9])?` and fit
//! in 63 characters; label keys allow an optional 253-character prefix split
//! from the name by the first `/`. User input is cleaned, never rejected,
//! with one exception: input with no valid characters at all passes through
//! unchanged and the API server gets to refuse it.

/// Maximum length for object names, label names, and label values.
const NAME_MAX: usize = 63;

/// Maximum length for a label key prefix.
const PREFIX_MAX: usize = 253;

/// Clean a workload name for use as `metadata.generateName`.
///
/// Lowercases, replaces every run of characters outside `[a-z0-9]` with a
/// single `-`, trims dashes from both ends, and truncates to 63 characters.
/// A leading digit is preserved.
pub fn sanitize_name(value: &str) -> String {
    let mut cleaned = String::with_capacity(value.len());
    for c in value.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            cleaned.push(c);
        } else if !cleaned.ends_with('-') {
            cleaned.push('-');
        }
    }
    truncate(cleaned.trim_matches('-'), NAME_MAX)
        .trim_end_matches('-')
        .to_string()
}

/// Clean a user-supplied label key, honoring an optional `prefix/name` split
/// on the first `/`. A leading `/` drops the empty prefix; later `/`s are
/// ordinary invalid characters in the name portion.
pub fn sanitize_label_key(key: &str) -> String {
    match key.split_once('/') {
        Some(("", name)) => sanitize_label_part(name, NAME_MAX),
        Some((prefix, name)) => format!(
            "{}/{}",
            sanitize_label_part(prefix, PREFIX_MAX),
            sanitize_label_part(name, NAME_MAX)
        ),
        None => sanitize_label_part(key, NAME_MAX),
    }
}

/// Clean a user-supplied label value.
pub fn sanitize_label_value(value: &str) -> String {
    sanitize_label_part(value, NAME_MAX)
}

/// Shared label cleaning: keep `[A-Za-z0-9._]`, collapse everything else
/// (including literal dashes) into single `-` separators, trim the ends, and
/// truncate. Input with no valid characters passes through unchanged.
fn sanitize_label_part(value: &str, max: usize) -> String {
    let mut cleaned = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            cleaned.push(c);
        } else if !cleaned.ends_with('-') {
            cleaned.push('-');
        }
    }
    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        return value.to_string();
    }
    truncate(trimmed, max).trim_end_matches('-').to_string()
}

fn truncate(value: &str, max: usize) -> &str {
    // Cleaned values are pure ASCII, so byte indexing is safe here.
    if value.len() <= max {
        value
    } else {
        &value[..max]
    }
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;

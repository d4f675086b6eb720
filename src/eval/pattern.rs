//! Patterns for the trimming and replacement operators.
//!
//! Trimming takes shell globs. Supported syntax:
//! - `*` matches zero or more characters
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]` match one character from the set
//! - `[!abc]` or `[^abc]` match one character NOT in the set
//! - `\c` matches `c` literally
//!
//! Everything else is literal. Globs are translated into regular
//! expressions and compiled per use.
//!
//! Replacement takes a regular expression as written, and its replacement
//! text understands `$$`, `$&`, `` $` ``, `$'`, `$1`..`$99` and `$<name>`.

use regex::{Captures, Regex};

use crate::error::{Error, Result};

/// Which end of the value a trimming operator works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Prefix,
    Suffix,
}

/// Whether the shortest or the longest match is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    Shortest,
    Longest,
}

/// Remove the shortest or longest prefix/suffix of `value` matched entirely by `pattern`.
///
/// Returns `value` unchanged when no prefix/suffix matches.
pub fn strip(value: &str, pattern: &str, end: End, extent: Extent) -> Result<String> {
    let regex = compile_glob(pattern)?;
    let boundaries: Vec<usize> = value
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(value.len()))
        .collect();

    let matches_at = |i: usize| match end {
        End::Prefix => regex.is_match(&value[..i]),
        End::Suffix => regex.is_match(&value[i..]),
    };

    // Prefixes grow with the split index, suffixes shrink.
    let ascending = matches!(
        (end, extent),
        (End::Prefix, Extent::Shortest) | (End::Suffix, Extent::Longest)
    );
    let split = if ascending {
        boundaries.iter().copied().find(|&i| matches_at(i))
    } else {
        boundaries.iter().rev().copied().find(|&i| matches_at(i))
    };

    Ok(match (split, end) {
        (None, _) => value.to_string(),
        (Some(i), End::Prefix) => value[i..].to_string(),
        (Some(i), End::Suffix) => value[..i].to_string(),
    })
}

/// Replace the first (or every) match of the regular expression `pattern`
/// in `value`, expanding `$` references in `replacement`.
pub fn replace(value: &str, pattern: &str, replacement: &str, all: bool) -> Result<String> {
    let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let groups = regex.captures_len() - 1;
    let named = regex.capture_names().flatten().next().is_some();
    let limit = if all { 0 } else { 1 };
    let replaced = regex.replacen(value, limit, |caps: &Captures<'_>| {
        substitution(replacement, caps, value, groups, named)
    });
    Ok(replaced.into_owned())
}

/// Expand the `$` references of `template` for one match.
///
/// References that name no group are kept as written.
fn substitution(
    template: &str,
    caps: &Captures<'_>,
    haystack: &str,
    groups: usize,
    named: bool,
) -> String {
    let whole = caps.get(0).map_or(0..0, |m| m.range());
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let tail = &rest[at + 1..];
        let consumed = match tail.as_bytes().first() {
            Some(b'$') => {
                out.push('$');
                1
            }
            Some(b'&') => {
                out.push_str(&haystack[whole.clone()]);
                1
            }
            Some(b'`') => {
                out.push_str(&haystack[..whole.start]);
                1
            }
            Some(b'\'') => {
                out.push_str(&haystack[whole.end..]);
                1
            }
            Some(b'0'..=b'9') => match group_reference(tail.as_bytes(), groups) {
                Some((index, len)) => {
                    out.push_str(caps.get(index).map_or("", |m| m.as_str()));
                    len
                }
                None => {
                    out.push('$');
                    0
                }
            },
            Some(b'<') if named => match tail.find('>') {
                Some(end) => {
                    out.push_str(caps.name(&tail[1..end]).map_or("", |m| m.as_str()));
                    end + 1
                }
                None => {
                    out.push('$');
                    0
                }
            },
            _ => {
                out.push('$');
                0
            }
        };
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

/// Group index and digit count of a `$n`/`$nn` reference. Two digits win
/// when they name an existing group.
fn group_reference(digits: &[u8], groups: usize) -> Option<(usize, usize)> {
    let first = usize::from(digits[0] - b'0');
    if let Some(&second @ b'0'..=b'9') = digits.get(1) {
        let index = first * 10 + usize::from(second - b'0');
        if (1..=groups).contains(&index) {
            return Some((index, 2));
        }
    }
    (1..=groups).contains(&first).then_some((first, 1))
}

fn compile_glob(pattern: &str) -> Result<Regex> {
    let source = format!(r"\A(?s:{})\z", translate(pattern));
    Regex::new(&source).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Translate a glob into regular expression syntax.
fn translate(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::new();
    let mut buf = [0u8; 4];
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                out.push_str(&regex::escape(chars[i].encode_utf8(&mut buf)));
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&translate_class(&chars[i + 1..end]));
                    i = end;
                }
                None => out.push_str(r"\["),
            },
            c => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
        i += 1;
    }
    out
}

/// Index of the `]` closing the bracket expression opened at `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if matches!(chars.get(i), Some('!' | '^')) {
        i += 1;
    }
    // A `]` right after the opening bracket is a member, not the terminator.
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    (i..chars.len()).find(|&j| chars[j] == ']')
}

fn translate_class(body: &[char]) -> String {
    let mut out = String::from("[");
    let items = match body.split_first() {
        Some(('!' | '^', rest)) => {
            out.push('^');
            rest
        }
        _ => body,
    };
    for (i, &c) in items.iter().enumerate() {
        let is_range = c == '-' && i > 0 && i + 1 < items.len();
        if !is_range && c.is_ascii_punctuation() && c != '<' && c != '>' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix(value: &str, pattern: &str, extent: Extent) -> String {
        strip(value, pattern, End::Prefix, extent).unwrap()
    }

    fn suffix(value: &str, pattern: &str, extent: Extent) -> String {
        strip(value, pattern, End::Suffix, extent).unwrap()
    }

    #[test]
    fn shortest_and_longest_prefix_differ() {
        assert_eq!(prefix("/path/to/something", "*/", Extent::Shortest), "path/to/something");
        assert_eq!(prefix("/path/to/something", "*/", Extent::Longest), "something");
    }

    #[test]
    fn shortest_and_longest_suffix_differ() {
        assert_eq!(suffix("/path/to/something", "/*", Extent::Shortest), "/path/to");
        assert_eq!(suffix("/path/to/something", "/*", Extent::Longest), "");
    }

    #[test]
    fn literal_pattern_strips_exact_text() {
        assert_eq!(prefix("Hello, world!", "Hello, ", Extent::Shortest), "world!");
        assert_eq!(suffix("Hello, world!", ", world!", Extent::Shortest), "Hello");
    }

    #[test]
    fn unmatched_pattern_leaves_value() {
        assert_eq!(prefix("abc", "x*", Extent::Longest), "abc");
        assert_eq!(suffix("abc", "*x", Extent::Shortest), "abc");
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert_eq!(prefix("a.b.c", "a.", Extent::Shortest), "b.c");
        assert_eq!(prefix("axb", "a.", Extent::Shortest), "axb");
        assert_eq!(suffix("1+1=2", "+1=2", Extent::Shortest), "1");
    }

    #[test]
    fn question_mark_and_classes() {
        assert_eq!(prefix("v1.2.3", "v?", Extent::Shortest), ".2.3");
        assert_eq!(prefix("abc123", "[a-c]*[a-c]", Extent::Longest), "123");
        assert_eq!(suffix("file.tar.gz", ".[!.]*", Extent::Shortest), "file.tar");
        assert_eq!(suffix("file.tar.gz", ".[!/]*", Extent::Longest), "file");
    }

    #[test]
    fn escaped_star_is_literal() {
        assert_eq!(prefix("*x*y", r"\*x", Extent::Shortest), "*y");
    }

    #[test]
    fn multibyte_values_split_on_char_boundaries() {
        assert_eq!(prefix("ééa", "?", Extent::Shortest), "éa");
        assert_eq!(suffix("aé", "?", Extent::Shortest), "a");
    }

    #[test]
    fn replace_first_and_all() {
        assert_eq!(replace("Hello, world!", "o", "e", false).unwrap(), "Helle, world!");
        assert_eq!(replace("Hello, world!", "o", "e", true).unwrap(), "Helle, werld!");
    }

    #[test]
    fn replacement_pattern_is_a_regex() {
        assert_eq!(replace("Hello, world!", "o.", "X", false).unwrap(), "HellX world!");
        assert_eq!(replace("Hello, world!", "[lo]+", "_", true).unwrap(), "He_, w_r_d!");
        assert_eq!(replace("a.b.c", ".", "-", false).unwrap(), "-.b.c");
    }

    #[test]
    fn replacement_expands_group_references() {
        assert_eq!(replace("key=value", "(\\w+)=(\\w+)", "$2=$1", false).unwrap(), "value=key");
        assert_eq!(replace("abc", "b", "[$&]", false).unwrap(), "a[b]c");
        assert_eq!(replace("abc", "b", "$`$'", false).unwrap(), "aacc");
        assert_eq!(replace("v1", "(?<n>\\d)", "<$<n>>", false).unwrap(), "v<1>");
        assert_eq!(replace("a-b", "-", "$$", false).unwrap(), "a$b");
    }

    #[test]
    fn references_to_missing_groups_stay_literal() {
        assert_eq!(replace("a-b", "-", "$1", false).unwrap(), "a$1b");
        assert_eq!(replace("a-b", "(-)", "$0$2", false).unwrap(), "a$0$2b");
        assert_eq!(replace("a-b", "(-)", "$10", false).unwrap(), "a-0b");
        assert_eq!(replace("a-b", "-", "$<n>", false).unwrap(), "a$<n>b");
    }

    #[test]
    fn invalid_replacement_pattern_is_reported() {
        let err = replace("abc", "(", "x", false).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { pattern, .. } if pattern == "("));
    }

    #[test]
    fn invalid_range_is_reported() {
        let err = strip("abc", "[z-a]", End::Prefix, Extent::Shortest).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }
}

//! Filename ordering helpers.
//!
//! Directory scans must process files in the order a person reading the
//! file manager expects, so `img2.png` sorts before `img10.png`. The
//! comparator is case-insensitive and compares digit runs numerically.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Compare two strings naturally: digit runs by numeric value, everything
/// else case-insensitively.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ia = a.chars().peekable();
    let mut ib = b.chars().peekable();

    loop {
        match (ia.peek().copied(), ib.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let na = take_digits(&mut ia);
                    let nb = take_digits(&mut ib);
                    match cmp_digit_runs(&na, &nb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    let la = ca.to_lowercase();
                    let lb = cb.to_lowercase();
                    match la.cmp(lb) {
                        Ordering::Equal => {
                            ia.next();
                            ib.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

/// Sort paths in place by the natural order of their file names.
pub fn sort_paths_naturally(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| natural_cmp(&file_name_str(a), &file_name_str(b)));
}

/// File name as a string, empty when the path has none.
pub fn file_name_str(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File stem as a string, empty when the path has none.
pub fn file_stem_str(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lowercased extension, empty when the path has none.
pub fn extension_lower(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn take_digits(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(c) = it.peek() {
        if c.is_ascii_digit() {
            out.push(*c);
            it.next();
        } else {
            break;
        }
    }
    out
}

/// Numeric comparison of two digit strings without parsing into a fixed
/// width integer: strip leading zeros, then shorter means smaller.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

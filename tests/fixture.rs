#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("failed to read fixture {name}: {err}"))
}

/// Non-comment, non-empty lines split on tabs, with their 1-based line numbers.
pub fn read_rows(name: &str) -> Vec<(usize, Vec<String>)> {
    read_fixture(name)
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim_end();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| (idx + 1, line.trim_end().split('\t').map(unescape).collect()))
        .collect()
}

/// Resolve `\n`, `\r`, `\t`, `\\` and `\xNN` escapes.
pub fn unescape(input: &str) -> String {
    let mut out = String::new();
    let mut iter = input.chars();

    while let Some(ch) = iter.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match iter.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('x') => {
                let hex: String = iter.by_ref().take(2).collect();
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) => out.push(byte as char),
                    Err(_) => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

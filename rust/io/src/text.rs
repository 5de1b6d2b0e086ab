// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line-oriented numeric parsing shared by the text formats

/// Iterate `(line_number, line)` over a buffer. Numbers are 1-based and
/// lines come without their `\n` / `\r\n` terminator.
pub(crate) fn lines(bytes: &[u8]) -> impl Iterator<Item = (usize, &[u8])> {
    let mut start = 0usize;
    let mut number = 0usize;
    memchr::memchr_iter(b'\n', bytes)
        .chain(std::iter::once(bytes.len()))
        .map(move |end| {
            let line = &bytes[start..end];
            start = end + 1;
            number += 1;
            (number, line.strip_suffix(b"\r").unwrap_or(line))
        })
}

/// Blank lines and `#` / `//` comments
#[inline]
pub(crate) fn is_skippable(line: &[u8]) -> bool {
    match line.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(i) => line[i] == b'#' || line[i..].starts_with(b"//"),
        None => true,
    }
}

/// Parse every whitespace, comma or semicolon separated number on a line.
/// Returns `None` on the first field that is not a number.
pub(crate) fn parse_numbers(line: &[u8], out: &mut Vec<f64>) -> Option<()> {
    out.clear();
    let mut pos = 0;
    while pos < line.len() {
        let b = line[pos];
        if b.is_ascii_whitespace() || b == b',' || b == b';' {
            pos += 1;
            continue;
        }
        match fast_float::parse_partial::<f64, _>(&line[pos..]) {
            Ok((value, consumed)) if consumed > 0 => {
                out.push(value);
                pos += consumed;
            }
            _ => return None,
        }
    }
    Some(())
}

/// Whitespace-separated tokens of a line
pub(crate) fn tokens(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|b| b.is_ascii_whitespace()).filter(|t| !t.is_empty())
}

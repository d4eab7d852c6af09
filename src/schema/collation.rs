//! Locale-style ordering for column names
//!
//! Names are decomposed (NFD) and compared in three passes, as a root-locale
//! collation does:
//! 1. base characters: punctuation before digits before letters, letters
//!    case-insensitive, accents ignored
//! 2. accents: an unaccented letter before its accented forms
//! 3. case: lowercase first
//!
//! Remaining ties fall back to raw bytes, so the order is total.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// Punctuation in the order a root-locale collation places it
const PUNCTUATION_ORDER: &str = "_-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$";

const CLASS_SPACE: u8 = 0;
const CLASS_PUNCT: u8 = 1;
const CLASS_DIGIT: u8 = 2;
const CLASS_LETTER: u8 = 3;

/// One base character with the combining marks that follow it
struct CollationElement {
    base: char,
    marks: Vec<char>,
}

fn elements(name: &str) -> Vec<CollationElement> {
    let mut out: Vec<CollationElement> = Vec::with_capacity(name.len());
    for c in name.nfd() {
        match out.last_mut() {
            Some(last) if is_combining_mark(c) => last.marks.push(c),
            _ => out.push(CollationElement {
                base: c,
                marks: Vec::new(),
            }),
        }
    }
    out
}

pub fn compare_names(a: &str, b: &str) -> Ordering {
    let (ea, eb) = (elements(a), elements(b));

    let primary = |els: &[CollationElement]| -> Vec<(u8, u32)> {
        els.iter().map(|e| primary_weight(e.base)).collect()
    };
    let accents = |els: &[CollationElement]| -> Vec<Vec<char>> {
        els.iter().map(|e| e.marks.clone()).collect()
    };
    let case = |els: &[CollationElement]| -> Vec<u8> {
        els.iter().map(|e| case_weight(e.base)).collect()
    };

    primary(&ea)
        .cmp(&primary(&eb))
        .then_with(|| accents(&ea).cmp(&accents(&eb)))
        .then_with(|| case(&ea).cmp(&case(&eb)))
        .then_with(|| a.cmp(b))
}

fn primary_weight(c: char) -> (u8, u32) {
    if c.is_whitespace() {
        return (CLASS_SPACE, c as u32);
    }
    if let Some(digit) = c.to_digit(10) {
        return (CLASS_DIGIT, digit);
    }
    if c.is_alphabetic() {
        let folded = c.to_lowercase().next().unwrap_or(c);
        return (CLASS_LETTER, folded as u32);
    }
    match PUNCTUATION_ORDER.find(c) {
        Some(rank) => (CLASS_PUNCT, rank as u32),
        None => (CLASS_PUNCT, PUNCTUATION_ORDER.len() as u32 + c as u32),
    }
}

fn case_weight(c: char) -> u8 {
    if c.is_uppercase() {
        1
    } else {
        0
    }
}

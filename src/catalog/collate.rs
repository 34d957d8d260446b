//! Locale-style string comparison for Portuguese titles and names.
//!
//! Base strength compares letters only: accents and case are ignored, so
//! "Água" and "agua" are equal. Variant strength breaks base ties by accents
//! (unaccented first) and then by case (lowercase first).
//!
//! Primary weights follow the usual locale ordering: whitespace, then
//! punctuation, then symbols, then digits, then letters.

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strength {
    Base,
    Variant,
}

pub fn base_key(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum CharClass {
    Space,
    Punctuation,
    Symbol,
    Digit,
    Letter,
}

const SYMBOLS: &str = concat!(
    "`^+<=>|~$",
    "\u{a8}\u{af}\u{b4}\u{b8}\u{ac}\u{b1}\u{d7}\u{f7}",
    "\u{a2}\u{a3}\u{a4}\u{a5}\u{20ac}\u{b0}\u{a9}\u{ae}",
);

fn classify(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Space
    } else if c.is_numeric() {
        CharClass::Digit
    } else if c.is_alphabetic() {
        CharClass::Letter
    } else if SYMBOLS.contains(c) {
        CharClass::Symbol
    } else {
        CharClass::Punctuation
    }
}

fn primary_weights(value: &str) -> Vec<(CharClass, char)> {
    base_key(value).chars().map(|c| (classify(c), c)).collect()
}

fn accent_key(value: &str) -> String {
    value.nfd().flat_map(char::to_lowercase).collect()
}

fn case_key(value: &str) -> Vec<bool> {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(char::is_uppercase)
        .collect()
}

pub fn compare(a: &str, b: &str, strength: Strength) -> Ordering {
    let primary = primary_weights(a).cmp(&primary_weights(b));
    if primary != Ordering::Equal || strength == Strength::Base {
        return primary;
    }
    accent_key(a)
        .cmp(&accent_key(b))
        .then_with(|| case_key(a).cmp(&case_key(b)))
}

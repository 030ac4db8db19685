// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment code generation and normalization.

use rand::Rng;
use unicode_normalization::UnicodeNormalization;

/// Characters used in codes. Lookalikes (`0/O`, `1/I`) are left out.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// How many fresh codes to try before giving up on a uniqueness collision.
pub const MAX_CODE_ATTEMPTS: usize = 8;

/// Produces random upper-case payment codes of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Generate a code using the thread-local RNG.
    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::thread_rng())
    }

    /// Generate a code from the given RNG.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        (0..self.length)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

/// Canonical form used when comparing codes with transfer comments.
///
/// Applies NFKC, upper-cases, and folds Cyrillic capitals that look like
/// Latin ones, since payers often retype the code on a Cyrillic layout.
pub fn normalize_code(text: &str) -> String {
    text.nfkc()
        .collect::<String>()
        .to_uppercase()
        .chars()
        .map(fold_lookalike)
        .collect()
}

fn fold_lookalike(c: char) -> char {
    match c {
        'А' => 'A',
        'В' => 'B',
        'Е' => 'E',
        'К' => 'K',
        'М' => 'M',
        'Н' => 'H',
        'О' => 'O',
        'Р' => 'P',
        'С' => 'C',
        'Т' => 'T',
        'Х' => 'X',
        'І' => 'I',
        other => other,
    }
}

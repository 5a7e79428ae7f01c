//! Canonical paths and their hashes.
//!
//! A path names one position in an operation, rooted at the operation
//! kind (`Q`, `M` or `S`):
//!
//! - `.name` selects a field,
//! - `|a,b,` follows a field that has arguments, listing their names sorted,
//! - `&Type` enters an inline fragment (omitted without a type condition),
//! - `/name` enters an argument or an input object field.
//!
//! Templates and requests build paths with the same [`PathBuilder`] so
//! equivalent positions always hash equally.

use std::hash::Hasher;

use rustc_hash::FxHasher;

pub type PathHash = u64;

#[must_use]
pub fn hash_path(path: &str) -> PathHash {
    let mut hasher = FxHasher::default();
    hasher.write(path.as_bytes());
    hasher.finish()
}

#[derive(Debug, Default, Clone)]
pub struct PathBuilder {
    text: String,
}

impl PathBuilder {
    pub fn reset(&mut self, root: &str) {
        self.text.clear();
        self.text.push_str(root);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.text.truncate(len);
    }

    pub fn push_field(&mut self, name: &str) {
        self.text.push('.');
        self.text.push_str(name);
    }

    /// Appends the argument set of a field. `names` must be sorted.
    pub fn push_arguments<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.text.push('|');
        for name in names {
            self.text.push_str(name);
            self.text.push(',');
        }
    }

    pub fn push_type_condition(&mut self, name: &str) {
        if !name.is_empty() {
            self.text.push('&');
            self.text.push_str(name);
        }
    }

    pub fn push_input(&mut self, name: &str) {
        self.text.push('/');
        self.text.push_str(name);
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn hash(&self) -> PathHash {
        hash_path(&self.text)
    }
}

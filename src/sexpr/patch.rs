//! Byte-range patches over the original document text.

use super::Span;
use std::io::{self, Write};

/// Replacement of one source span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Bytes to replace; zero-width for an insertion
    pub span: Span,
    /// Text written in their place
    pub text: String,
}

/// Ordered collection of non-overlapping patches
#[derive(Debug, Default, Clone)]
pub struct PatchSet {
    patches: Vec<Patch>,
}

impl PatchSet {
    /// Empty patch set
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `span` with `text`
    pub fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.patches.push(Patch {
            span,
            text: text.into(),
        });
    }

    /// Insert `text` at `offset` without removing anything
    pub fn insert(&mut self, offset: usize, text: impl Into<String>) {
        self.replace(Span::at(offset), text);
    }

    /// Remove the bytes covered by `span`
    pub fn remove(&mut self, span: Span) {
        self.replace(span, String::new());
    }

    /// Number of queued patches
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// True when nothing has been queued
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Stream `source` with every patch applied into `writer`.
    ///
    /// Patches are applied in source order. Insertions sharing an offset keep
    /// the order in which they were queued.
    pub fn write_to<W: Write>(&self, source: &str, mut writer: W) -> io::Result<()> {
        let mut ordered: Vec<&Patch> = self.patches.iter().collect();
        ordered.sort_by_key(|p| (p.span.start, p.span.end));

        let mut cursor = 0;
        for patch in ordered {
            if patch.span.start < cursor || patch.span.end > source.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "patch {}..{} overlaps a previous edit or runs past the document",
                        patch.span.start, patch.span.end
                    ),
                ));
            }
            writer.write_all(&source.as_bytes()[cursor..patch.span.start])?;
            writer.write_all(patch.text.as_bytes())?;
            cursor = patch.span.end;
        }
        writer.write_all(&source.as_bytes()[cursor..])?;
        Ok(())
    }

    /// Apply every patch and return the resulting text
    pub fn apply(&self, source: &str) -> io::Result<String> {
        let mut out = Vec::with_capacity(source.len());
        self.write_to(source, &mut out)?;
        String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

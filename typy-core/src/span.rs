//! Byte ranges into the source text.

use std::fmt;

/// Half-open byte range `from..to` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub fn new(from: usize, to: usize) -> Self {
        Span { from, to }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }

    /// Text covered by this span, or `""` if it does not fall on
    /// character boundaries of `source`.
    pub fn text(self, source: &str) -> &str {
        source.get(self.from..self.to).unwrap_or("")
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_and_covers() {
        let source = "x = 42";
        assert_eq!(Span::new(4, 6).text(source), "42");
        assert_eq!(Span::new(4, 60).text(source), "");
        assert_eq!(Span::new(0, 1).cover(Span::new(4, 6)), Span::new(0, 6));
    }
}

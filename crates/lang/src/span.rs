/// Location of a token or node.
///
/// For tokens `start..end` is a byte range into the source. For AST nodes it
/// is a range of token indices, which `error` maps back to bytes when a
/// report is printed. `line` is 1-based in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }

    pub fn to(self, other: Span) -> Self {
        Self {
            start: self.start,
            end: other.end,
            line: self.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T>
where
    T: Clone,
{
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T>
where
    T: Clone,
{
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }
}

/// Byte offset to line lookup for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(src: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { line_starts }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }
}

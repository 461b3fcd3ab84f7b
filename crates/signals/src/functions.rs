use crate::index::IndexedFile;
use crate::syntax::{visit_items, SyntaxItem};
use serde::{Deserialize, Serialize};
use sigfix_protocol::LineRange;

/// A function-like construct with a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpan {
    pub file: String,
    pub name: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    pub length: usize,
}

impl FunctionSpan {
    pub fn new(file: impl Into<String>, name: impl Into<String>, span: LineRange) -> Self {
        Self {
            file: file.into(),
            name: name.into(),
            start_line: span.start_line,
            end_line: span.end_line,
            length: span.len(),
        }
    }

    pub fn range(&self) -> LineRange {
        LineRange::new(self.start_line, self.end_line)
    }
}

/// Aggregate length statistics across all spans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionStats {
    pub max_length: usize,
    /// Rounded to 2 decimals
    pub mean_length: f64,
    pub count: usize,
}

impl FunctionStats {
    pub fn from_spans(spans: &[FunctionSpan]) -> Self {
        if spans.is_empty() {
            return Self::default();
        }
        let total: usize = spans.iter().map(|s| s.length).sum();
        let mean = total as f64 / spans.len() as f64;
        Self {
            max_length: spans.iter().map(|s| s.length).max().unwrap_or(0),
            mean_length: (mean * 100.0).round() / 100.0,
            count: spans.len(),
        }
    }
}

/// Every function span in `file`, in document order.
pub fn collect_function_spans(file: &IndexedFile) -> Vec<FunctionSpan> {
    let Some(tree) = &file.tree else {
        return Vec::new();
    };

    let mut spans = Vec::new();
    visit_items(tree, &file.content, file.language, |item| {
        if let SyntaxItem::Function { name, span } = item {
            spans.push(FunctionSpan::new(file.record.path.clone(), name, span));
        }
    });
    spans
}

/// Spans at or above `threshold`, longest first (ties: path, then start line).
pub fn long_functions(spans: &[FunctionSpan], threshold: usize) -> Vec<&FunctionSpan> {
    let mut long: Vec<&FunctionSpan> = spans.iter().filter(|s| s.length >= threshold).collect();
    long.sort_by(|a, b| {
        b.length
            .cmp(&a.length)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.start_line.cmp(&b.start_line))
    });
    long
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SourceIndexer;
    use crate::source::SourceSet;
    use pretty_assertions::assert_eq;

    fn spans_for(path: &str, code: &str) -> Vec<FunctionSpan> {
        let sources = SourceSet::from_pairs([(path, code)]);
        let mut indexer = SourceIndexer::new();
        let files = indexer.index(&sources);
        collect_function_spans(&files[0])
    }

    fn function_with_body_lines(name: &str, body_lines: usize) -> String {
        let mut code = format!("function {name}() {{\n");
        for i in 0..body_lines {
            code.push_str(&format!("  total += {i};\n"));
        }
        code.push_str("}\n");
        code
    }

    #[test]
    fn span_length_is_inclusive() {
        let code = function_with_body_lines("work", 3);
        let spans = spans_for("a.js", &code);

        assert_eq!(spans, vec![FunctionSpan::new("a.js", "work", LineRange::new(1, 5))]);
        assert_eq!(spans[0].length, spans[0].end_line - spans[0].start_line + 1);
    }

    #[test]
    fn nested_functions_each_contribute() {
        let code = "function outer() {\n  const inner = () => {\n    return 1;\n  };\n  return inner();\n}\n";
        let spans = spans_for("a.ts", code);
        let names: Vec<_> = spans.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
        assert_eq!(spans[1].range(), LineRange::new(2, 4));
    }

    #[test]
    fn stats_round_mean_to_two_decimals() {
        let spans = vec![
            FunctionSpan::new("a", "x", LineRange::new(1, 1)),
            FunctionSpan::new("a", "y", LineRange::new(1, 1)),
            FunctionSpan::new("a", "z", LineRange::new(1, 2)),
        ];
        let stats = FunctionStats::from_spans(&spans);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.max_length, 2);
        assert_eq!(stats.mean_length, 1.33);
        assert_eq!(FunctionStats::from_spans(&[]), FunctionStats::default());
    }

    #[test]
    fn long_functions_are_sorted_longest_first() {
        let spans = vec![
            FunctionSpan::new("b.ts", "short", LineRange::new(1, 10)),
            FunctionSpan::new("b.ts", "mid", LineRange::new(20, 79)),
            FunctionSpan::new("a.ts", "big", LineRange::new(1, 90)),
            FunctionSpan::new("a.ts", "edge", LineRange::new(100, 149)),
        ];
        let long: Vec<_> = long_functions(&spans, 50)
            .into_iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(long, vec!["big", "mid", "edge"]);
    }
}

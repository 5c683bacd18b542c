/// A cell found on one text line, with the character column it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CellSpan {
    pub start: usize,
    pub text: String,
}

impl CellSpan {
    fn width(&self) -> usize {
        self.text.chars().count()
    }

    /// Twice the center column, kept integral.
    fn center2(&self) -> usize {
        self.start * 2 + self.width()
    }
}

fn flush_span(current: &mut String, start: usize, spans: &mut Vec<CellSpan>) {
    let text = current.trim();
    if !text.is_empty() {
        spans.push(CellSpan {
            start,
            text: text.to_string(),
        });
    }
    current.clear();
}

/// Splits a line on tabs and on runs of two or more spaces.
pub(crate) fn split_line_into_spans(line: &str) -> Vec<CellSpan> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut start = 0_usize;
    let mut whitespace_run = 0_usize;

    for (column, ch) in line.chars().enumerate() {
        if ch == '\t' {
            flush_span(&mut current, start, &mut spans);
            whitespace_run = 0;
            continue;
        }

        if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                flush_span(&mut current, start, &mut spans);
            } else if !current.is_empty() {
                current.push(' ');
            }
            continue;
        }

        if current.is_empty() {
            start = column;
        }
        whitespace_run = 0;
        current.push(ch);
    }

    flush_span(&mut current, start, &mut spans);
    spans
}

/// Places each span under the anchor (header cell) whose center is closest,
/// leaving `None` where a column has no value on this line.
pub(crate) fn align_to_anchors(spans: &[CellSpan], anchors: &[CellSpan]) -> Vec<Option<String>> {
    let mut row: Vec<Option<String>> = vec![None; anchors.len()];
    if anchors.is_empty() {
        return row;
    }

    for span in spans {
        let column = anchors
            .iter()
            .enumerate()
            .min_by_key(|(_, anchor)| anchor.center2().abs_diff(span.center2()))
            .map_or(0, |(index, _)| index);

        match &mut row[column] {
            Some(existing) => {
                existing.push(' ');
                existing.push_str(&span.text);
            }
            slot @ None => *slot = Some(span.text.clone()),
        }
    }

    row
}

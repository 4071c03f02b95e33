use std::collections::HashMap;

use crate::search::SearchState;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DiffKind {
    Context,
    Added,
    Removed,
    Header,
}

impl DiffKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Context => " ",
            Self::Added => "+",
            Self::Removed => "-",
            Self::Header => "",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DiffLine {
    pub text: String,
    pub kind: DiffKind,
}

impl DiffLine {
    fn new(text: impl Into<String>, kind: DiffKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Edit {
    Equal(usize),
    Delete(usize),
    Insert(usize),
}

/// Line-level diff: every distinct line becomes a token, the token sequences are
/// diffed with Myers' algorithm, and the edit script is expanded back into lines.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    let mut table = HashMap::new();
    let old_tokens = tokenize(&old_lines, &mut table);
    let new_tokens = tokenize(&new_lines, &mut table);

    myers(&old_tokens, &new_tokens)
        .into_iter()
        .map(|edit| match edit {
            Edit::Equal(index) => DiffLine::new(old_lines[index], DiffKind::Context),
            Edit::Delete(index) => DiffLine::new(old_lines[index], DiffKind::Removed),
            Edit::Insert(index) => DiffLine::new(new_lines[index], DiffKind::Added),
        })
        .collect()
}

fn tokenize<'a>(lines: &[&'a str], table: &mut HashMap<&'a str, u32>) -> Vec<u32> {
    lines
        .iter()
        .map(|line| {
            let next = table.len() as u32;
            *table.entry(*line).or_insert(next)
        })
        .collect()
}

fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = text.split('\n').collect::<Vec<_>>();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

fn myers(a: &[u32], b: &[u32]) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }

    let offset = max;
    let slot = |k: isize| (k + offset) as usize;
    let mut v = vec![0isize; (2 * max + 2) as usize];
    let mut trace = Vec::new();

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[slot(k - 1)] < v[slot(k + 1)]) {
                v[slot(k + 1)]
            } else {
                v[slot(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[slot(k)] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let mut edits = Vec::new();
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[slot(k - 1)] < v[slot(k + 1)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[slot(prev_k)];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(Edit::Equal((x - 1) as usize));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                edits.push(Edit::Insert((y - 1) as usize));
            } else {
                edits.push(Edit::Delete((x - 1) as usize));
            }
        }
        x = prev_x;
        y = prev_y;
    }

    edits.reverse();
    edits
}

/// Scrollable unified diff with search.
#[derive(Debug, Clone)]
pub struct DiffViewer {
    title: String,
    lines: Vec<DiffLine>,
    offset: usize,
    height: usize,
    search: SearchState,
}

impl DiffViewer {
    pub fn new(
        title: impl Into<String>,
        old_label: &str,
        new_label: &str,
        body: Vec<DiffLine>,
    ) -> Self {
        let mut lines = vec![
            DiffLine::new(format!("--- {old_label}"), DiffKind::Header),
            DiffLine::new(format!("+++ {new_label}"), DiffKind::Header),
        ];
        lines.extend(body);
        Self {
            title: title.into(),
            lines,
            offset: 0,
            height: 20,
            search: SearchState::default(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lines(&self) -> &[DiffLine] {
        &self.lines
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut SearchState {
        &mut self.search
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.max_offset() as isize;
        self.offset = (self.offset as isize + delta).clamp(0, max) as usize;
    }

    pub fn half_page(&self) -> isize {
        (self.height / 2).max(1) as isize
    }

    pub fn scroll_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    pub fn commit_search(&mut self) {
        let target = self
            .search
            .commit(self.lines.iter().map(|line| line.text.as_str()));
        self.reveal(target);
    }

    pub fn next_match(&mut self) {
        let target = self.search.next();
        self.reveal(target);
    }

    pub fn prev_match(&mut self) {
        let target = self.search.prev();
        self.reveal(target);
    }

    fn reveal(&mut self, line: Option<usize>) {
        let Some(line) = line else {
            return;
        };
        if line < self.offset || line >= self.offset + self.height {
            self.offset = line.min(self.max_offset());
        }
    }

    pub fn summary(&self) -> (usize, usize) {
        self.lines.iter().fold((0, 0), |(added, removed), line| match line.kind {
            DiffKind::Added => (added + 1, removed),
            DiffKind::Removed => (added, removed + 1),
            _ => (added, removed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{DiffKind, DiffLine, DiffViewer, diff_lines};

    fn kinds(lines: &[DiffLine]) -> Vec<DiffKind> {
        lines.iter().map(|line| line.kind).collect()
    }

    #[test]
    fn identical_inputs_emit_only_context() {
        let text = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: web\n";
        let diff = diff_lines(text, text);
        assert_eq!(diff.len(), 4);
        assert!(diff.iter().all(|line| line.kind == DiffKind::Context));
    }

    #[test]
    fn empty_old_emits_only_added_lines() {
        let new = "a\nb\nc\n";
        let diff = diff_lines("", new);
        assert!(diff.iter().all(|line| line.kind == DiffKind::Added));
        let joined = diff
            .iter()
            .map(|line| format!("{}\n", line.text))
            .collect::<String>();
        assert_eq!(joined, new);
    }

    #[test]
    fn changed_value_emits_remove_then_add() {
        let diff = diff_lines("a:1\nb:2\n", "a:1\nb:3\n");
        assert_eq!(
            diff,
            vec![
                DiffLine {
                    text: "a:1".to_string(),
                    kind: DiffKind::Context
                },
                DiffLine {
                    text: "b:2".to_string(),
                    kind: DiffKind::Removed
                },
                DiffLine {
                    text: "b:3".to_string(),
                    kind: DiffKind::Added
                },
            ]
        );
    }

    #[test]
    fn insertion_in_the_middle_keeps_surrounding_context() {
        let diff = diff_lines("one\nthree\n", "one\ntwo\nthree\n");
        assert_eq!(
            kinds(&diff),
            vec![DiffKind::Context, DiffKind::Added, DiffKind::Context]
        );
        assert_eq!(diff[1].text, "two");
    }

    #[test]
    fn deleting_everything_emits_only_removed() {
        let diff = diff_lines("x\ny\n", "");
        assert_eq!(kinds(&diff), vec![DiffKind::Removed, DiffKind::Removed]);
    }

    #[test]
    fn viewer_search_wraps_and_scrolls() {
        let body = (0..30)
            .map(|index| DiffLine {
                text: if index % 10 == 0 {
                    format!("image: v{index}")
                } else {
                    format!("line {index}")
                },
                kind: DiffKind::Context,
            })
            .collect();
        let mut viewer = DiffViewer::new("diff", "old", "new", body);
        viewer.set_height(5);
        viewer.search_mut().begin();
        for c in "IMAGE".chars() {
            viewer.search_mut().push_char(c);
        }
        viewer.commit_search();
        assert_eq!(viewer.search().matches(), &[2, 12, 22]);
        assert_eq!(viewer.offset(), 0);
        viewer.next_match();
        assert_eq!(viewer.offset(), 12);
        viewer.next_match();
        viewer.next_match();
        assert!(viewer.search().is_current(2));
        assert_eq!(viewer.offset(), 2);
        assert_eq!(viewer.summary(), (0, 0));
    }
}

/// Incremental search over a line buffer, shared by the log and diff viewers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    input: String,
    typing: bool,
    query: String,
    matches: Vec<usize>,
    current: Option<usize>,
}

impl SearchState {
    pub fn begin(&mut self) {
        self.typing = true;
        self.input = self.query.clone();
    }

    pub fn typing(&self) -> bool {
        self.typing
    }

    pub fn push_char(&mut self, c: char) {
        if self.typing {
            self.input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.typing {
            self.input.pop();
        }
    }

    pub fn cancel(&mut self) {
        self.typing = false;
        self.input.clear();
    }

    /// Commits the typed query and returns the line index of the first match.
    pub fn commit<'a>(&mut self, lines: impl Iterator<Item = &'a str>) -> Option<usize> {
        self.typing = false;
        self.query = std::mem::take(&mut self.input);
        self.recompute(lines);
        self.current_line()
    }

    pub fn recompute<'a>(&mut self, lines: impl Iterator<Item = &'a str>) {
        self.matches.clear();
        self.current = None;
        if self.query.is_empty() {
            return;
        }

        let needle = self.query.to_lowercase();
        self.matches = lines
            .enumerate()
            .filter(|(_, line)| line.to_lowercase().contains(&needle))
            .map(|(index, _)| index)
            .collect();
        if !self.matches.is_empty() {
            self.current = Some(0);
        }
    }

    /// Tracks a line appended at `index`.
    pub fn observe_line(&mut self, index: usize, line: &str) {
        if self.query.is_empty() || !line.to_lowercase().contains(&self.query.to_lowercase()) {
            return;
        }
        self.matches.push(index);
        if self.current.is_none() {
            self.current = Some(0);
        }
    }

    /// Shifts match indices after `count` lines were dropped from the front.
    pub fn drop_front(&mut self, count: usize) {
        if count == 0 || self.matches.is_empty() {
            return;
        }

        let before = self.matches.len();
        self.matches.retain(|index| *index >= count);
        for index in &mut self.matches {
            *index -= count;
        }
        let removed = before - self.matches.len();
        self.current = match self.current {
            _ if self.matches.is_empty() => None,
            Some(current) => Some(current.saturating_sub(removed).min(self.matches.len() - 1)),
            None => Some(0),
        };
    }

    #[cfg(test)]
    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    pub fn current_line(&self) -> Option<usize> {
        self.current.and_then(|current| self.matches.get(current).copied())
    }

    pub fn next(&mut self) -> Option<usize> {
        let count = self.matches.len();
        if count == 0 {
            return None;
        }
        self.current = Some(self.current.map_or(0, |current| (current + 1) % count));
        self.current_line()
    }

    pub fn prev(&mut self) -> Option<usize> {
        let count = self.matches.len();
        if count == 0 {
            return None;
        }
        self.current = Some(
            self.current
                .map_or(count - 1, |current| (current + count - 1) % count),
        );
        self.current_line()
    }

    pub fn is_match(&self, line: usize) -> bool {
        self.matches.binary_search(&line).is_ok()
    }

    pub fn is_current(&self, line: usize) -> bool {
        self.current_line() == Some(line)
    }

    pub fn status_label(&self) -> Option<String> {
        if self.typing {
            return Some(format!("/{}", self.input));
        }
        if self.query.is_empty() {
            return None;
        }
        match self.current {
            Some(current) => Some(format!(
                "/{} [{}/{}]",
                self.query,
                current + 1,
                self.matches.len()
            )),
            None => Some(format!("/{} [no matches]", self.query)),
        }
    }
}

use crate::search::SearchState;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_LOG_CAPACITY: usize = 10_000;
pub const DEFAULT_TAIL_LINES: i64 = 100;

/// Parameters for one log read against a pod container.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LogRequest {
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
    pub follow: bool,
    pub tail_lines: Option<i64>,
    pub since_seconds: Option<i64>,
    pub previous: bool,
    pub timestamps: bool,
}

/// Identifies a running stream and stops it when cancelled.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    id: u64,
    token: CancellationToken,
}

impl StreamHandle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl PartialEq for StreamHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StreamHandle {}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogStyle {
    Error,
    Warn,
    /// First 23 characters are a timestamp prefix.
    Timestamp,
    Plain,
}

pub fn highlight_line(line: &str) -> LogStyle {
    let lower = line.to_lowercase();
    if lower.contains("error") || lower.contains("fatal") || lower.contains("panic") {
        return LogStyle::Error;
    }
    if lower.contains("warn") {
        return LogStyle::Warn;
    }

    let bytes = line.as_bytes();
    if bytes.len() > 10 && bytes[4] == b'-' && bytes[7] == b'-' && bytes[10] == b'T' {
        return LogStyle::Timestamp;
    }
    LogStyle::Plain
}

/// Splits a timestamped line after its first 23 characters.
pub fn split_timestamp(line: &str) -> (&str, &str) {
    match line.char_indices().nth(23) {
        Some((index, _)) => line.split_at(index),
        None => (line, ""),
    }
}

#[derive(Debug)]
pub struct LogViewer {
    namespace: String,
    pod: String,
    containers: Vec<String>,
    container: Option<String>,
    lines: VecDeque<String>,
    capacity: usize,
    offset: usize,
    follow: bool,
    height: usize,
    search: SearchState,
    stream: Option<StreamHandle>,
    stream_id: Option<u64>,
    stopped: bool,
    ended: bool,
    previous: bool,
}

impl LogViewer {
    pub fn new(
        namespace: impl Into<String>,
        pod: impl Into<String>,
        containers: Vec<String>,
        capacity: usize,
    ) -> Self {
        let container = containers.first().cloned();
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            containers,
            container,
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            offset: 0,
            follow: true,
            height: 20,
            search: SearchState::default(),
            stream: None,
            stream_id: None,
            stopped: true,
            ended: false,
            previous: false,
        }
    }

    /// Opens a following stream for the current container and returns its request.
    pub fn start(
        &mut self,
        stream_id: u64,
        tail_lines: i64,
        since_seconds: Option<i64>,
    ) -> (LogRequest, StreamHandle) {
        self.stop();
        let handle = StreamHandle::new(stream_id);
        self.stream = Some(handle.clone());
        self.stream_id = Some(stream_id);
        self.stopped = false;
        self.ended = false;
        self.previous = false;
        self.follow = true;

        let request = LogRequest {
            namespace: self.namespace.clone(),
            pod: self.pod.clone(),
            container: self.container.clone(),
            follow: true,
            tail_lines: Some(tail_lines),
            since_seconds,
            previous: false,
            timestamps: false,
        };
        (request, handle)
    }

    /// Fetches the previous container instance once instead of following.
    pub fn start_previous(&mut self, stream_id: u64, tail_lines: i64) -> (LogRequest, StreamHandle) {
        let (mut request, handle) = self.start(stream_id, tail_lines, None);
        self.lines.clear();
        self.offset = 0;
        self.search = SearchState::default();
        self.previous = true;
        request.follow = false;
        request.previous = true;
        (request, handle)
    }

    pub fn previous(&self) -> bool {
        self.previous
    }

    /// Cancels the stream; later calls are no-ops.
    pub fn stop(&mut self) {
        if let Some(handle) = self.stream.take() {
            handle.cancel();
        }
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn stream_id(&self) -> Option<u64> {
        self.stream_id
    }

    fn accepts(&self, stream_id: u64) -> bool {
        !self.stopped && self.stream_id == Some(stream_id)
    }

    /// Appends a streamed line; lines from stopped or replaced streams are ignored.
    pub fn append(&mut self, stream_id: u64, line: String) -> bool {
        if !self.accepts(stream_id) {
            return false;
        }
        self.push_line(line);
        true
    }

    fn push_line(&mut self, line: String) {
        self.lines.push_back(line);
        let mut dropped = 0usize;
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            self.search.drop_front(dropped);
            self.offset = self.offset.saturating_sub(dropped);
        }

        let index = self.lines.len() - 1;
        if let Some(line) = self.lines.back() {
            self.search.observe_line(index, line);
        }

        if self.follow {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    /// Records a mid-stream failure as a visible line and halts the stream.
    pub fn stream_failed(&mut self, stream_id: u64, message: &str) -> bool {
        if !self.accepts(stream_id) {
            return false;
        }
        self.push_line(format!("Error: {message}"));
        self.stop();
        self.ended = true;
        true
    }

    pub fn stream_ended(&mut self, stream_id: u64) {
        if self.stream_id == Some(stream_id) {
            self.ended = true;
        }
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn lines(&self) -> &VecDeque<String> {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn follow(&self) -> bool {
        self.follow
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut SearchState {
        &mut self.search
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn pod(&self) -> &str {
        &self.pod
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn containers(&self) -> &[String] {
        &self.containers
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        if self.follow {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.follow = false;
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = (self.offset + lines).min(self.max_offset());
    }

    pub fn half_page(&self) -> usize {
        (self.height / 2).max(1)
    }

    pub fn scroll_top(&mut self) {
        self.follow = false;
        self.offset = 0;
    }

    pub fn scroll_bottom(&mut self) {
        self.follow = true;
        self.offset = self.max_offset();
    }

    pub fn begin_search(&mut self) {
        self.follow = false;
        self.search.begin();
    }

    pub fn commit_search(&mut self) {
        let target = self
            .search
            .commit(self.lines.iter().map(String::as_str));
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
        self.follow = false;
        if line < self.offset || line >= self.offset + self.height {
            self.offset = line.min(self.max_offset());
        }
    }

    /// Moves to the next container and clears the buffer; `None` for single-container pods.
    pub fn next_container(&mut self) -> Option<String> {
        if self.containers.len() < 2 {
            return None;
        }
        let current = self
            .container
            .as_ref()
            .and_then(|name| self.containers.iter().position(|entry| entry == name))
            .unwrap_or(0);
        let next = self.containers[(current + 1) % self.containers.len()].clone();
        self.container = Some(next.clone());
        self.lines.clear();
        self.offset = 0;
        self.search = SearchState::default();
        Some(next)
    }

    pub fn title(&self) -> String {
        let mut title = format!("Logs {}/{}", self.namespace, self.pod);
        if let Some(container) = self.container.as_deref() {
            title.push_str(&format!(" [{container}]"));
        }
        if self.previous {
            title.push_str(" (previous)");
        }
        if self.ended {
            title.push_str(" (stream ended)");
        } else if self.follow {
            title.push_str(" (follow)");
        }
        title
    }
}

impl Drop for LogViewer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::{LogStyle, LogViewer, highlight_line, split_timestamp};

    fn started(capacity: usize) -> (LogViewer, u64) {
        let mut viewer = LogViewer::new("default", "web", vec!["app".to_string()], capacity);
        let (request, handle) = viewer.start(7, 100, None);
        assert!(request.follow);
        assert_eq!(request.tail_lines, Some(100));
        assert_eq!(request.container.as_deref(), Some("app"));
        (viewer, handle.id())
    }

    #[test]
    fn follow_tracks_bottom_until_user_scrolls() {
        let (mut viewer, id) = started(10_000);
        viewer.set_height(20);
        for index in 0..100 {
            viewer.append(id, format!("line {index}"));
        }
        assert!(viewer.follow());
        assert_eq!(viewer.offset(), 80);

        viewer.scroll_up(1);
        assert!(!viewer.follow());
        assert_eq!(viewer.offset(), 79);

        viewer.scroll_bottom();
        assert!(viewer.follow());
        assert_eq!(viewer.offset(), viewer.max_offset());

        viewer.append(id, "late 1".to_string());
        viewer.append(id, "late 2".to_string());
        assert_eq!(viewer.offset(), 82);
        assert_eq!(viewer.offset(), viewer.max_offset());
    }

    #[test]
    fn ring_is_bounded_and_fifo() {
        let (mut viewer, id) = started(5);
        for index in 0..12 {
            viewer.append(id, format!("{index}"));
            assert!(viewer.len() <= viewer.capacity());
        }
        let kept = viewer.lines().iter().cloned().collect::<Vec<_>>();
        assert_eq!(kept, vec!["7", "8", "9", "10", "11"]);
    }

    #[test]
    fn lines_for_stopped_or_foreign_streams_are_ignored() {
        let (mut viewer, id) = started(100);
        assert!(!viewer.append(id + 1, "other".to_string()));
        assert!(viewer.append(id, "mine".to_string()));
        viewer.stop();
        assert!(!viewer.append(id, "late".to_string()));
        assert_eq!(viewer.len(), 1);
    }

    #[test]
    fn stop_is_idempotent_and_cancels_the_token() {
        let mut viewer = LogViewer::new("default", "web", Vec::new(), 10);
        let (_, handle) = viewer.start(1, 100, None);
        viewer.stop();
        assert!(handle.is_cancelled());
        viewer.stop();
        assert!(viewer.is_stopped());
    }

    #[test]
    fn stream_error_is_appended_and_halts() {
        let (mut viewer, id) = started(100);
        viewer.append(id, "ok".to_string());
        assert!(viewer.stream_failed(id, "connection reset"));
        assert_eq!(
            viewer.lines().back().map(String::as_str),
            Some("Error: connection reset")
        );
        assert!(viewer.ended());
        assert!(!viewer.append(id, "after".to_string()));
    }

    #[test]
    fn search_clears_follow_and_tracks_dropped_lines() {
        let (mut viewer, id) = started(4);
        viewer.set_height(2);
        for line in ["boot", "ERROR one", "fine", "error two"] {
            viewer.append(id, line.to_string());
        }
        viewer.begin_search();
        assert!(!viewer.follow());
        for c in "error".chars() {
            viewer.search_mut().push_char(c);
        }
        viewer.commit_search();
        assert_eq!(viewer.search().matches(), &[1, 3]);

        viewer.append(id, "more".to_string());
        viewer.append(id, "more".to_string());
        assert_eq!(viewer.search().matches(), &[1]);
        viewer.next_match();
        assert!(viewer.search().is_current(1));
    }

    #[test]
    fn container_switch_cycles() {
        let mut viewer = LogViewer::new(
            "default",
            "web",
            vec!["app".to_string(), "proxy".to_string()],
            10,
        );
        assert_eq!(viewer.next_container().as_deref(), Some("proxy"));
        assert_eq!(viewer.next_container().as_deref(), Some("app"));
        let mut single = LogViewer::new("default", "web", vec!["app".to_string()], 10);
        assert_eq!(single.next_container(), None);
    }

    #[test]
    fn previous_logs_replace_the_follow_stream() {
        let mut viewer = LogViewer::new("default", "web", vec!["app".to_string()], 10);
        let (_, live) = viewer.start(1, 50, None);
        viewer.append(1, "live".to_string());

        let (request, _) = viewer.start_previous(2, 50);
        assert!(live.is_cancelled());
        assert!(!request.follow);
        assert!(request.previous);
        assert!(viewer.previous());
        assert!(viewer.lines().is_empty());
        assert!(viewer.title().contains("(previous)"));

        viewer.start(3, 50, None);
        assert!(!viewer.previous());
    }

    #[test]
    fn highlight_rules() {
        assert_eq!(highlight_line("FATAL: boom"), LogStyle::Error);
        assert_eq!(highlight_line("thread panicked"), LogStyle::Error);
        assert_eq!(highlight_line("WARNING disk"), LogStyle::Warn);
        let line = "2024-01-02T03:04:05.678Z starting";
        assert_eq!(highlight_line(line), LogStyle::Timestamp);
        assert_eq!(split_timestamp(line), ("2024-01-02T03:04:05.678", "Z starting"));
        assert_eq!(highlight_line("hello"), LogStyle::Plain);
    }
}

use std::collections::{HashSet, VecDeque};

/// 廣度優先的待爬佇列與已造訪集合
///
/// 同一個網址不會同時在佇列中出現兩次，造訪過的網址也不會再進佇列。
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
    pending: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new(seed: &str) -> Self {
        let mut frontier = Self::default();
        frontier.enqueue(seed.to_string());
        frontier
    }

    /// 加入佇列尾端；已造訪或已在佇列中則忽略
    pub fn enqueue(&mut self, url: String) -> bool {
        if self.visited.contains(&url) || self.pending.contains(&url) {
            return false;
        }
        self.pending.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// 取出最早加入的網址
    pub fn pop_next(&mut self) -> Option<String> {
        let url = self.queue.pop_front()?;
        self.pending.remove(&url);
        Some(url)
    }

    pub fn mark_visited(&mut self, url: String) {
        self.visited.insert(url);
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// 拆成（已造訪、尚未造訪）
    pub fn into_parts(self) -> (HashSet<String>, Vec<String>) {
        (self.visited, self.queue.into_iter().collect())
    }
}

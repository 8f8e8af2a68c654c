use crate::model::{Direction, Track};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

/// Ordered track list navigated through an effective order that is either
/// linear or a shuffled permutation of the item indices.
#[derive(Debug)]
pub struct Playlist {
    items: Vec<Track>,
    order: Vec<usize>,
    cursor: usize,
    shuffled: bool,
    rng: SmallRng,
}

impl Playlist {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            items: Vec::new(),
            order: Vec::new(),
            cursor: 0,
            shuffled: false,
            rng,
        }
    }

    /// Replaces the whole playlist and moves the cursor to the first entry.
    pub fn load(&mut self, tracks: Vec<Track>, shuffle: bool) {
        self.items = tracks;
        self.shuffled = shuffle;
        if shuffle {
            self.rebuild_shuffle_order();
        } else {
            self.order = (0..self.items.len()).collect();
        }
        self.cursor = 0;
    }

    /// Enabling always draws a fresh permutation and restarts at its head.
    /// Disabling goes back to linear order, keeping the current track.
    pub fn set_shuffle(&mut self, enabled: bool) {
        if enabled {
            self.shuffled = true;
            self.rebuild_shuffle_order();
            self.cursor = 0;
            return;
        }

        if !self.shuffled {
            return;
        }
        let current_item = self.order.get(self.cursor).copied().unwrap_or(0);
        self.shuffled = false;
        self.order = (0..self.items.len()).collect();
        self.cursor = if current_item < self.items.len() {
            current_item
        } else {
            0
        };
    }

    pub fn advance(&mut self, direction: Direction) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        self.cursor = match direction {
            Direction::Forward => (self.cursor + 1) % len,
            Direction::Backward => (self.cursor + len - 1) % len,
        };
    }

    pub fn current(&self) -> Option<&Track> {
        let item = *self.order.get(self.cursor)?;
        self.items.get(item)
    }

    /// Manual navigation wraps, so a next entry exists whenever the list is non-empty.
    pub fn has_next(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn is_last_in_order(&self) -> bool {
        !self.items.is_empty() && self.cursor == self.items.len() - 1
    }

    pub fn cursor(&self) -> Option<usize> {
        (!self.items.is_empty()).then_some(self.cursor)
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn tracks(&self) -> &[Track] {
        &self.items
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn rebuild_shuffle_order(&mut self) {
        self.order = (0..self.items.len()).collect();
        self.order.shuffle(&mut self.rng);
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new()
    }
}

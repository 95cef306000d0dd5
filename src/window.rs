
// imports
use crate::error::{GloveError, Result};
use crate::vocab::TokenId;

use std::collections::VecDeque;
use std::fmt::{self, Display};


/// Sliding window over a stream of token ids.
///
/// ```text
/// [left buffer] center [right buffer]
/// <0...width-1>        <0...width-1>
/// <----------- shifting direction.
/// ```
///
/// Both buffers always hold exactly `width` slots, an empty slot is `None`.
/// A center hands its neighborhood to the caller once, right before it is
/// shifted out of the center position; at that point the tokens on both of its
/// sides are known (or the stream has ended).
#[derive(Clone, Debug)]
pub struct ContextWindow {
    width: usize,
    left: VecDeque<Option<TokenId>>,
    center: Option<TokenId>,
    right: VecDeque<Option<TokenId>>,
}

impl ContextWindow {

    pub fn new(width: usize) -> Result<ContextWindow> {
        if width == 0 {
            return Err(GloveError::Usage("window size must be at least 1".to_string()));
        }
        Ok(Self {
            width,
            left: VecDeque::from(vec![None; width]),
            center: None,
            right: VecDeque::from(vec![None; width]),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn center(&self) -> Option<TokenId> {
        self.center
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_none()
    }

    /// Neighbors of the current center with their distance to it (1 for the
    /// slots right next to the center, up to `width`). Left side first, from the
    /// farthest slot, then the right side from the nearest one.
    pub fn neighbors(&self) -> impl Iterator<Item = (TokenId, usize)> + '_ {
        let width = self.width;
        let active = self.center.is_some();
        let left = self.left
            .iter()
            .enumerate()
            .filter_map(move |(i, slot)| slot.map(|id| (id, width - i)));
        let right = self.right
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|id| (id, i + 1)));
        left.chain(right).filter(move |_| active)
    }

    /// Feeds the next id of the stream. `emit` is called with the window if a
    /// center leaves the window during this step.
    pub fn slide<F>(&mut self, next: TokenId, emit: F)
    where F: FnMut(&ContextWindow) {

        if self.center.is_none() {
            // first id of the stream, nothing to shift
            self.center = Some(next);
            return;
        }
        if let Some(slot) = self.right.iter_mut().find(|slot| slot.is_none()) {
            // still filling the right buffer
            *slot = Some(next);
            return;
        }
        self.shift(Some(next), emit);
    }

    /// Pushes the buffered ids through the center until the window is empty.
    /// The window can be reused for a new stream afterwards.
    pub fn drain<F>(&mut self, mut emit: F)
    where F: FnMut(&ContextWindow) {
        while self.center.is_some() {
            self.shift(None, &mut emit);
        }
        self.left.iter_mut().for_each(|slot| *slot = None);
    }

    fn shift<F>(&mut self, next: Option<TokenId>, mut emit: F)
    where F: FnMut(&ContextWindow) {
        if self.center.is_some() {
            emit(&*self);
        }
        // 1. drop the oldest left entry, 2. the center joins the left buffer,
        // 3. the nearest right entry becomes the center, 4. `next` fills the right end
        self.left.pop_front();
        self.left.push_back(self.center.take());
        self.center = self.right.pop_front().flatten();
        self.right.push_back(next);
    }
}

impl Display for ContextWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |slot: &Option<TokenId>| slot.map_or("_".to_string(), |id| id.to_string());
        let left: Vec<String> = self.left.iter().map(show).collect();
        let right: Vec<String> = self.right.iter().map(show).collect();
        write!(f, "[{}] {} [{}]", left.join(" "), show(&self.center), right.join(" "))
    }
}

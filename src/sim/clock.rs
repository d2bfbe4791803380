/// Hour counter for a simulation run.
///
/// Yields each hour exactly once in ascending order, which is what makes
/// the engine's state sequence `S_0 → … → S_N` free of skips and replays.
///
/// # Examples
///
/// ```
/// use duel_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(3);
/// let mut hours = Vec::new();
///
/// while let Some(h) = clock.tick() {
///     hours.push(h);
/// }
/// assert_eq!(hours, vec![0, 1, 2]);
/// ```
pub struct Clock {
    current: usize,
    total: usize,
}

impl Clock {
    /// Creates a clock that will yield hours `0..total`.
    pub fn new(total: usize) -> Self {
        Self { current: 0, total }
    }

    /// Returns the next hour, or `None` once all hours were yielded.
    pub fn tick(&mut self) -> Option<usize> {
        if self.current < self.total {
            let hour = self.current;
            self.current += 1;
            Some(hour)
        } else {
            None
        }
    }

    /// Hours not yet yielded.
    pub fn remaining(&self) -> usize {
        self.total - self.current
    }
}

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Deadlines with cancellable handles. Time is whatever the caller passes in, which keeps
/// the classifier deterministic under test.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    pending: Vec<(TimerId, Instant, K)>,
    next_id: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }
}

impl<K: Copy> TimerQueue<K> {
    pub fn schedule(&mut self, kind: K, deadline: Instant) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push((id, deadline, kind));
        id
    }

    /// Returns whether the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(pending, _, _)| *pending != id);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|(pending, _, _)| *pending == id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(_, deadline, _)| *deadline).min()
    }

    /// Removes and returns the earliest timer due at `now`. Ties fire in schedule order.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, K)> {
        let (index, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (_, deadline, _))| *deadline <= now)
            .min_by_key(|(_, (id, deadline, _))| (*deadline, *id))?;
        let (id, _, kind) = self.pending.remove(index);
        Some((id, kind))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pop_due_in_deadline_order() {
        let t0 = Instant::now();
        let mut timers = TimerQueue::default();
        let late = timers.schedule('b', t0 + Duration::from_millis(300));
        let early = timers.schedule('a', t0 + Duration::from_millis(200));

        assert_eq!(timers.pop_due(t0 + Duration::from_millis(100)), None);
        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_millis(200)));
        assert_eq!(
            timers.pop_due(t0 + Duration::from_millis(500)),
            Some((early, 'a'))
        );
        assert_eq!(
            timers.pop_due(t0 + Duration::from_millis(500)),
            Some((late, 'b'))
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let t0 = Instant::now();
        let mut timers = TimerQueue::default();
        let id = timers.schedule((), t0);

        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(!timers.is_pending(id));
        assert_eq!(timers.pop_due(t0 + Duration::from_secs(10)), None);
    }
}

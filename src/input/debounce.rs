use std::time::Duration;

/// Trailing-edge debounce timer driven by the controller's clock.
///
/// Each push re-arms the timer and replaces the pending value, so a burst
/// collapses to its last value once `delay` passes without another push.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Duration, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&mut self, value: T, now: Duration) {
        self.pending = Some((now + self.delay, value));
    }

    /// Takes the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if *deadline <= now => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_delivers_last_value() {
        let ms = Duration::from_millis;
        let mut d = Debouncer::new(ms(100));
        for (i, t) in [0, 20, 40, 60, 80].into_iter().enumerate() {
            d.push(i, ms(t));
            assert_eq!(d.poll(ms(t)), None);
        }
        assert_eq!(d.poll(ms(179)), None);
        assert_eq!(d.poll(ms(180)), Some(4));
        assert_eq!(d.poll(ms(500)), None);
    }

    #[test]
    fn test_cancel() {
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.push("x", Duration::ZERO);
        d.cancel();
        assert!(!d.is_pending());
        assert_eq!(d.poll(Duration::from_secs(1)), None);
    }
}

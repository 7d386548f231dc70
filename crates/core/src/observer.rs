//! Synchronous notification of state changes.

/// Receives events pushed by their owner in mutation order.
pub trait Observer<E> {
    /// Observes one event.
    fn observe(&mut self, event: &E);
}

/// Blanket implementation for observer closures.
impl<E, F> Observer<E> for F
where
    F: FnMut(&E),
{
    fn observe(&mut self, event: &E) {
        self(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_observe() {
        let mut seen = Vec::new();
        {
            let mut observer = |event: &u32| seen.push(*event);
            observer.observe(&1);
            observer.observe(&2);
        }
        assert_eq!(seen, vec![1, 2]);
    }
}

use parking_lot::Mutex;

/// Orders a connection's registry mutations against its disconnect.
///
/// Command transitions run through [`ChannelGate::run`] and the disconnect
/// finalize through [`ChannelGate::close`]. Once closed, no later command can
/// open a session the disconnect already cleaned up. The lock is only held
/// for the synchronous registry call, never across an external request.
#[derive(Debug, Default)]
pub struct ChannelGate {
    closed: Mutex<bool>,
}

impl ChannelGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` unless the channel has already closed.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let closed = self.closed.lock();
        if *closed { None } else { Some(f()) }
    }

    /// Closes the channel and runs `f`. Only the first call runs.
    pub fn close<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let mut closed = self.closed.lock();
        if *closed {
            return None;
        }
        *closed = true;
        Some(f())
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_until_closed() {
        let gate = ChannelGate::new();
        assert_eq!(gate.run(|| 1), Some(1));
        assert_eq!(gate.close(|| 2), Some(2));
        assert_eq!(gate.run(|| 3), None);
        assert!(gate.is_closed());
    }

    #[test]
    fn test_close_runs_once() {
        let gate = ChannelGate::new();
        assert_eq!(gate.close(|| "first"), Some("first"));
        assert_eq!(gate.close(|| "second"), None);
    }
}

use crate::host::HostSignal;

/// Trait for systems that react to host signals.
///
/// `H` is the host the handler may read from and act on while handling.
pub trait SignalHandler<H: ?Sized> {
    /// Handle a single signal
    fn handle_signal(&mut self, signal: &HostSignal, host: &mut H);

    /// Handle multiple signals (default implementation calls handle_signal for each)
    fn handle_signals(&mut self, signals: &[HostSignal], host: &mut H) {
        for signal in signals {
            self.handle_signal(signal, host);
        }
    }
}

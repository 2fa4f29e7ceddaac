use tlm_types::Event;

/// Receives decoded events in arrival order.
///
/// The decoder calls [`emit`](Self::emit) synchronously from inside
/// [`TelemetryDecoder::accept`](crate::TelemetryDecoder::accept), once per
/// event, and hands over ownership.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

/// Adapts a closure into an [`EventSink`].
///
/// ```rust
/// use tlm_decoder::{Event, FnSink, TelemetryDecoder};
///
/// let mut count = 0;
/// let mut sink = FnSink(|_event: Event| count += 1);
/// let mut decoder = TelemetryDecoder::with_defaults();
/// decoder.accept(&[], &mut sink).unwrap();
/// drop(sink);
/// assert_eq!(count, 0);
/// ```
pub struct FnSink<F>(pub F);

impl<F: FnMut(Event)> EventSink for FnSink<F> {
    fn emit(&mut self, event: Event) {
        (self.0)(event);
    }
}

/// Counts events and drops them.
#[derive(Clone, Copy, Debug, Default)]
pub struct CountingSink {
    pub count: usize,
}

impl EventSink for CountingSink {
    fn emit(&mut self, _event: Event) {
        self.count += 1;
    }
}

/// Outcome notifications emitted by the allocator.
///
/// They carry the success/failure reporting a driver program would print;
/// the allocator itself only hands them to the installed [`Observer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
  Allocated { address: usize, length: usize },
  AllocationFailed { length: usize },
  Freed { address: usize, length: usize },
  UnknownFree { address: usize },
  Defragmented { merged: usize },
}

impl Event {
  /// Whether the operation that produced this event did what was asked.
  pub fn succeeded(&self) -> bool {
    !matches!(
      self,
      Event::AllocationFailed { .. } | Event::UnknownFree { .. }
    )
  }
}

pub trait Observer {
  fn on_event(
    &mut self,
    event: &Event,
  );
}

impl<F: FnMut(&Event)> Observer for F {
  fn on_event(
    &mut self,
    event: &Event,
  ) {
    self(event)
  }
}

//! Borrow events - models, the event source seam, and the reducer.

mod event_reducer;
mod events_model;
mod events_traits;

pub use event_reducer::{EventReducer, Reduction};
pub use events_model::{BorrowEvent, BoundaryPolicy};
pub use events_traits::{EventSource, EventStream};

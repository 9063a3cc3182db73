pub mod events;
pub mod payment;

pub use events::{
    BookingCancelledEvent, BookingConfirmedEvent, BookingCreatedEvent, CalendarChangedEvent,
};
pub use payment::{PaymentEvent, PaymentKind, PaymentResult, RefundInstruction};

pub mod store;
pub mod lifecycle;
pub mod release;
pub mod booking;
pub mod consistency;
pub mod jobs;

pub use store::{AppointmentStore, InMemoryAppointmentStore};
pub use lifecycle::AppointmentLifecycleService;
pub use release::SlotReleaseCoordinator;
pub use booking::AppointmentBookingService;
pub use consistency::OfferConsistencyChecker;
pub use jobs::{JobKind, SlotReleaseJobs, SlotReleaseScheduler};

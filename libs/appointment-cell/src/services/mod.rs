pub mod availability;
pub mod booking;
pub mod lifecycle;
pub mod persistence;
pub mod store;
pub mod view;
pub mod wizard;

pub use availability::BookingWindow;
pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use persistence::{FileSnapshotStore, InMemorySnapshotStore, SnapshotStore, StorageError, StoreSnapshot};
pub use store::SchedulingStore;
pub use view::ViewScope;
pub use wizard::{BookingWizard, CommitOutcome, Selection, WizardError, WizardRoutes, WizardStep};

//! Services module
//!
//! Per-collection business logic. All writes go through the shared
//! [`Synchronizer`].

pub mod enquiries;
pub mod feedback;
pub mod portfolio;
pub mod rettings;
pub mod synchronizer;

pub use enquiries::EnquiryService;
pub use feedback::FeedbackService;
pub use portfolio::PortfolioService;
pub use rettings::RettingService;
pub use synchronizer::{registration_message, CollectionChanged, PersistOutcome, Synchronizer};

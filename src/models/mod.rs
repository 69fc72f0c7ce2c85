pub mod event;
pub mod page;
pub mod registration;
pub mod user;

pub use event::{Event, EventCategory, EventResponse, EventStatus, Location, LocationType};
pub use page::{Page, PageRequest};
pub use registration::{Registration, RegistrationFilter, RegistrationStatus, RegistrationWithEvent};
pub use user::{User, UserPreferences, UserProfileResponse};

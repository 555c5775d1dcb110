pub mod appointment;
pub mod enums;
pub mod patient;
pub mod profile;
pub mod record;
pub mod visit;

pub use appointment::Appointment;
pub use enums::{AppointmentStatus, PriorityTag, Role};
pub use patient::Patient;
pub use profile::Profile;
pub use record::MedicalRecord;
pub use visit::CommunityVisit;

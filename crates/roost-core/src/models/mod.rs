pub mod notification;
pub mod presence;
pub mod profile;

pub use notification::{NotificationEvent, NotificationKind, NotificationPatch, NotificationRow, SubjectRef};
pub use presence::{PresenceRecord, PresenceRow};
pub use profile::{ActorProfile, ProfileRow};

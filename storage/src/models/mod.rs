mod admission;
mod message_record;
mod user_record;

pub use admission::{Admission, WindowPolicy};
pub use message_record::MessageRecord;
pub use user_record::UserRecord;

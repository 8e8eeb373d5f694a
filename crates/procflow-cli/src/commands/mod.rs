pub mod conversation;
pub mod projects;
pub mod sessions;

pub mod assignments;
pub mod export;
pub mod groups;
pub mod permissions;
pub mod roles;
pub mod users;

pub mod health;
pub mod root;
pub mod status;
pub mod version;

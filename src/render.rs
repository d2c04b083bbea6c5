pub mod atlas;
pub mod composite;

pub mod resource;
pub mod resource_desc;
pub mod resource_state;
pub mod view;

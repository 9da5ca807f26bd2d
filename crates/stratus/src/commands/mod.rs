pub mod lifecycle;
pub mod lookup;
pub mod schema;
pub mod state;
pub mod validate;

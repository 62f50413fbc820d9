pub mod collection;
pub mod movie;
pub mod request_counter;
pub mod user;

pub mod category;
pub mod poll;
pub mod poll_category;
pub mod poll_option;
pub mod prelude;
pub mod vote;

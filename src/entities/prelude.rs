#![allow(unused_imports)]

pub use super::category::Entity as Category;
pub use super::poll::Entity as Poll;
pub use super::poll_category::Entity as PollCategory;
pub use super::poll_option::Entity as PollOption;
pub use super::vote::Entity as Vote;

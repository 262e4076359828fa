//! Request handlers module

pub mod audit;
pub mod catalog;
pub mod company;
pub mod group;
pub mod post;

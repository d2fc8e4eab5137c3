pub mod calendar;
pub mod catalog;
pub mod context;
pub mod error;
pub mod generator;
pub mod maintenance;
pub mod occurrence;
pub mod timeline;

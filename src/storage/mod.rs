pub mod catalog;
pub mod database;
pub mod manager;
pub mod migrations;
pub mod outcomes;
pub mod path_utils;

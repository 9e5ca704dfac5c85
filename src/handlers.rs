pub mod activities;
pub mod audit;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod reports;
pub mod uploads;
pub mod users;

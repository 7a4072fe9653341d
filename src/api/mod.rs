pub mod models;
pub mod page;
pub mod response;
pub mod routes;
pub mod upload;

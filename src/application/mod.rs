// Application layer - Use cases over the domain rules
pub mod dashboard_service;
pub mod history;
pub mod rollup;
pub mod store_repository;

// Domain layer - Entities and pure business rules
pub mod document;
pub mod reading;
pub mod sensor;
pub mod status;

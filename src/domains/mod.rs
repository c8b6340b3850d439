pub mod address;
pub mod envelope;
pub mod push;

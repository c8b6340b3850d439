pub mod acknowledger;
pub mod dedup;
pub mod delivery;
pub mod gateway;
pub mod poller;
pub mod push;
pub mod transport;

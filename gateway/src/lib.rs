pub mod anchor;
pub mod cfg;
pub mod error;
pub mod event;
pub mod gateway;
pub mod ledger;
pub mod message;
pub mod message_bus;
pub mod payment;
pub mod proof;
pub mod relayer;
pub mod state;
pub mod token;

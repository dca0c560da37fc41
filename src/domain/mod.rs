//! Domain layer: entities, their state machines and the ports the engine depends on.

pub mod catalog;
pub mod changeset;
pub mod codes;
pub mod identity;
pub mod ids;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod proof;
pub mod tournament;

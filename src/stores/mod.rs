pub mod peer_registry;
pub mod swarm;

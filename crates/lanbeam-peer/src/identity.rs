//! Who this node says it is when joining the relay.

use lanbeam_common::new_id;
use lanbeam_config::ClientConfig;
use rand::seq::SliceRandom;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "Cosmic", "Neon", "Cyber", "Quantum", "Galactic", "Stellar", "Lunar", "Solar", "Digital",
    "Electric", "Sonic", "Rapid", "Turbo", "Hyper", "Mega", "Ultra", "Phantom", "Shadow",
    "Crimson", "Azure", "Emerald", "Golden", "Silver", "Iron", "Titanium", "Bionic", "Astro",
    "Techno", "Retro", "Future",
];

const NOUNS: &[&str] = &[
    "Phoenix", "Dragon", "Tiger", "Wolf", "Eagle", "Falcon", "Hawk", "Raven", "Viper", "Cobra",
    "Python", "Jaguar", "Leopard", "Lion", "Bear", "Shark", "Whale", "Dolphin", "Orbit", "Comet",
    "Star", "Planet", "Nebula", "Nova", "Pulsar", "Quasar", "Vortex", "Matrix", "System",
    "Network", "Glitch", "Bot", "Droid", "Cyborg", "Titan", "Giant", "Ninja", "Samurai", "Knight",
    "Ranger", "Scout", "Pilot", "Captain", "Commander", "Voyager", "Explorer",
];

/// Identity announced in `join`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    /// Stable across sessions.
    pub device_id: String,
    pub display_name: String,
}

impl NodeIdentity {
    pub fn new(device_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            display_name: display_name.into(),
        }
    }

    /// Use the configured values, generating whichever is missing.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            device_id: config.device_id.clone().unwrap_or_else(new_id),
            display_name: config
                .display_name
                .clone()
                .unwrap_or_else(generate_display_name),
        }
    }
}

/// A random name like "Neon Falcon 42".
pub fn generate_display_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Cosmic");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("Voyager");
    let number: u16 = rng.gen_range(0..1000);
    format!("{adjective} {noun} {number}")
}

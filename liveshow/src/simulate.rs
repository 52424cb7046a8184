use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::config;

const MESSAGES: &[&str] = &[
    "Great session!",
    "Thank you for the update",
    "When is the next meeting?",
    "Very informative",
    "Keep up the good work",
    "Greetings from the district office",
    "Excellent leadership",
    "Looking forward to more sessions",
];

const USERNAMES: &[&str] = &[
    "RameshSharma",
    "PriyaGupta",
    "VikasKumar",
    "SunitaVerma",
    "AjayThakur",
    "MeeraJoshi",
    "RajeshPatel",
    "KavitaSingh",
];

/// Cosmetic audience activity while a broadcast is on air
pub trait ActivitySimulator: Send + Sync {
    /// Viewer count right after going live
    fn seed_viewers(&mut self) -> u32;

    fn next_viewers(&mut self, current: u32) -> u32;

    /// Optional `(username, message)` from a simulated viewer
    fn next_chat(&mut self) -> Option<(String, String)>;
}

pub struct RandomActivity {
    rng: StdRng,
    seed_min: u32,
    seed_max: u32,
    chat_probability: f64,
}

impl RandomActivity {
    pub fn new(cfg: &config::Simulate) -> Self {
        Self::with_rng(cfg, StdRng::from_os_rng())
    }

    pub fn with_rng(cfg: &config::Simulate, rng: StdRng) -> Self {
        Self {
            rng,
            seed_min: cfg.seed_min,
            seed_max: cfg.seed_max.max(cfg.seed_min),
            chat_probability: cfg.chat_probability.clamp(0.0, 1.0),
        }
    }
}

impl ActivitySimulator for RandomActivity {
    fn seed_viewers(&mut self) -> u32 {
        self.rng.random_range(self.seed_min..=self.seed_max)
    }

    fn next_viewers(&mut self, current: u32) -> u32 {
        let delta: i64 = self.rng.random_range(-5..5);
        (current as i64 + delta).max(0) as u32
    }

    fn next_chat(&mut self) -> Option<(String, String)> {
        if !self.rng.random_bool(self.chat_probability) {
            return None;
        }
        let username = USERNAMES.choose(&mut self.rng)?;
        let message = MESSAGES.choose(&mut self.rng)?;
        Some((username.to_string(), message.to_string()))
    }
}

/// Fixed audience without chatter
#[derive(Debug, Clone, Copy, Default)]
pub struct QuietActivity {
    pub viewers: u32,
}

impl ActivitySimulator for QuietActivity {
    fn seed_viewers(&mut self) -> u32 {
        self.viewers
    }

    fn next_viewers(&mut self, current: u32) -> u32 {
        current
    }

    fn next_chat(&mut self) -> Option<(String, String)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_activity_bounds() {
        let cfg = config::Simulate {
            chat_probability: 1.0,
            ..Default::default()
        };
        let mut sim = RandomActivity::with_rng(&cfg, StdRng::seed_from_u64(7));
        for _ in 0..100 {
            let seed = sim.seed_viewers();
            assert!((cfg.seed_min..=cfg.seed_max).contains(&seed));
        }
        for _ in 0..100 {
            assert!(sim.next_viewers(0) <= 4);
            let next = sim.next_viewers(100);
            assert!((95..=104).contains(&next));
        }
        let (username, message) = sim.next_chat().unwrap();
        assert!(USERNAMES.contains(&username.as_str()));
        assert!(MESSAGES.contains(&message.as_str()));
    }

    #[test]
    fn test_silent_when_probability_zero() {
        let cfg = config::Simulate {
            chat_probability: 0.0,
            ..Default::default()
        };
        let mut sim = RandomActivity::with_rng(&cfg, StdRng::seed_from_u64(1));
        assert!((0..50).all(|_| sim.next_chat().is_none()));
    }
}

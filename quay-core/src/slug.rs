//! Preview subdomain generation
//!
//! Subdomains are human-readable `adjective-color-animal` slugs drawn from
//! fixed word lists, always matching `^[a-z0-9-]+$`. Generation is random
//! and collisions are possible; the caller retries against the unique
//! constraint a bounded number of times.

use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "agile", "bold", "brave", "bright", "calm", "clever", "eager", "fancy", "gentle", "happy",
    "keen", "lively", "lucky", "mellow", "noble", "proud", "quick", "quiet", "rapid", "shiny",
    "smooth", "steady", "swift", "witty",
];

const COLORS: &[&str] = &[
    "amber", "azure", "coral", "crimson", "emerald", "golden", "indigo", "ivory", "jade", "lilac",
    "maroon", "olive", "pearl", "ruby", "scarlet", "silver", "teal", "violet",
];

const ANIMALS: &[&str] = &[
    "badger", "beaver", "bison", "condor", "crane", "dolphin", "falcon", "ferret", "gecko",
    "heron", "ibex", "jackal", "lemur", "lynx", "marmot", "otter", "panda", "penguin", "puffin",
    "raven", "salmon", "tapir", "walrus", "wombat",
];

/// Generates a random preview subdomain
pub fn generate_subdomain() -> String {
    let mut rng = rand::thread_rng();

    format!(
        "{}-{}-{}",
        ADJECTIVES.choose(&mut rng).unwrap(),
        COLORS.choose(&mut rng).unwrap(),
        ANIMALS.choose(&mut rng).unwrap(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_subdomain_charset() {
        for _ in 0..100 {
            let slug = generate_subdomain();
            assert!(!slug.is_empty());
            assert!(
                slug.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            );
            assert!(!slug.starts_with('-'));
            assert!(!slug.ends_with('-'));
        }
    }

    #[test]
    fn test_subdomain_varies() {
        let slugs: HashSet<String> = (0..200).map(|_| generate_subdomain()).collect();

        // Random draws from ~10k combinations should not all collide.
        assert!(slugs.len() > 50);
    }
}

//! Deterministic operator names for demo plants.
//! Same RNG seed = same names.

use crate::rng::DemoRng;

pub struct NameGenerator;

impl NameGenerator {
    pub fn generate_full_name(rng: &mut DemoRng) -> String {
        let first = *rng.pick(FIRST_NAMES);
        let last = *rng.pick(LAST_NAMES);
        format!("{first} {last}")
    }

    /// Avatar placeholder derived from the initials.
    pub fn avatar_for(name: &str) -> String {
        let initials: String = name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .collect();
        format!("avatars/{}.png", initials.to_lowercase())
    }
}

const FIRST_NAMES: &[&str] = &[
    "Aino", "Amara", "Anders", "Beatriz", "Bilal", "Carmen", "Chidi", "Dana",
    "Dmitri", "Elif", "Emeka", "Farah", "Freya", "Gustavo", "Hana", "Henrik",
    "Ines", "Ivo", "Jana", "Jonas", "Kaito", "Kamala", "Lars", "Leila",
    "Luca", "Maren", "Mateo", "Mei", "Nadia", "Nils", "Oskar", "Priya",
    "Rafael", "Rosa", "Sami", "Sanna", "Tariq", "Tomas", "Yara", "Zofia",
];

const LAST_NAMES: &[&str] = &[
    "Andersson", "Bauer", "Costa", "Dubois", "Eriksen", "Fischer", "Gomes", "Haddad",
    "Ito", "Jensen", "Kowalski", "Lindqvist", "Moreau", "Nakamura", "Okafor", "Petrov",
    "Quintero", "Rossi", "Schneider", "Tanaka", "Urban", "Varga", "Weber", "Yilmaz",
    "Zimmermann", "Novak", "Horvat", "Sato", "Mendes", "Ferreira",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DemoStream;

    #[test]
    fn name_generation_is_deterministic() {
        let mut rng1 = DemoRng::new(12345, DemoStream::Operators);
        let mut rng2 = DemoRng::new(12345, DemoStream::Operators);

        for _ in 0..20 {
            assert_eq!(
                NameGenerator::generate_full_name(&mut rng1),
                NameGenerator::generate_full_name(&mut rng2),
                "Same seed should produce same names"
            );
        }
    }

    #[test]
    fn generates_two_part_names() {
        let mut rng = DemoRng::new(7, DemoStream::Operators);
        for _ in 0..100 {
            let name = NameGenerator::generate_full_name(&mut rng);
            let parts: Vec<&str> = name.split_whitespace().collect();
            assert_eq!(parts.len(), 2, "Name should have exactly 2 parts: {name}");
        }
    }

    #[test]
    fn avatar_uses_initials() {
        assert_eq!(NameGenerator::avatar_for("Mei Tanaka"), "avatars/mt.png");
    }
}

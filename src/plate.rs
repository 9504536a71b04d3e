/// Canonical plate form: uppercase, `[A-Z0-9]` only. An empty result means
/// nothing usable was recognized.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_separators_and_uppercases() {
        assert_eq!(normalize("wx 12-34a"), "WX1234A");
        assert_eq!(normalize(" abc.123\n"), "ABC123");
    }

    #[test]
    fn drops_non_ascii_letters() {
        assert_eq!(normalize("ŁÓDŹ 7"), "D7");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("--- "), "");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "\\PC*") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn output_is_plate_alphabet(s in "\\PC*") {
            prop_assert!(normalize(&s).chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }
}

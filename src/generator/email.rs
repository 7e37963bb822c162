//! Email format combinations

/// Components of a well-formed address, in order
pub const EMAIL_PARTS: [&str; 5] = ["before", "@", "after", ".", "end"];

/// Number of presence/absence combinations of the parts
pub const EMAIL_VARIANTS: usize = 1 << EMAIL_PARTS.len();

/// Every combination of present/absent parts, starting with the full address
///
/// Returns the candidate address and whether all parts are present.
pub fn email_variants() -> impl Iterator<Item = (String, bool)> {
    (0..EMAIL_VARIANTS).map(|mask| {
        let last = EMAIL_PARTS.len() - 1;
        let address: String = EMAIL_PARTS
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << (last - i)) == 0)
            .map(|(_, part)| *part)
            .collect();
        (address, mask == 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_two_variants_one_valid() {
        let variants: Vec<_> = email_variants().collect();
        assert_eq!(variants.len(), 32);
        assert_eq!(variants[0], ("before@after.end".to_string(), true));
        assert_eq!(variants.iter().filter(|(_, valid)| *valid).count(), 1);
        assert_eq!(variants[31].0, "");
    }

    #[test]
    fn variants_are_distinct() {
        let mut addresses: Vec<_> = email_variants().map(|(a, _)| a).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), 32);
    }

    #[test]
    fn drops_last_part_first() {
        let variants: Vec<_> = email_variants().collect();
        assert_eq!(variants[1].0, "before@after.");
        assert_eq!(variants[16].0, "@after.end");
    }
}

#[cfg(test)]
mod tests {
    use crate::virtual_machine::isa::{Arity, Cost, MAX_VERSION, Mnemonic};
    use std::collections::HashSet;

    macro_rules! collect_table {
        (
            $(
                $(#[$doc:meta])*
                $name:ident = $mnemonic:literal => [ $( $field:ident : $kind:ident ),* $(,)? ],
                since $version:literal, cost $cost:tt, args $arity:tt, stack $stack:literal
            ),* $(,)?
        ) => {
            vec![ $( (stringify!($name), $mnemonic, $version as u8, $stack as usize, &[ $( stringify!($kind) ),* ] as &'static [&'static str]) ),* ]
        };
    }

    fn table() -> Vec<(&'static str, &'static str, u8, usize, &'static [&'static str])> {
        crate::for_each_opcode!(collect_table)
    }

    #[test]
    fn mnemonics_are_unique() {
        let mut seen = HashSet::new();
        for (name, mnemonic, ..) in table() {
            assert!(seen.insert(mnemonic), "{name} reuses mnemonic {mnemonic}");
        }
        assert_eq!(seen.len(), Mnemonic::ALL.len());
    }

    #[test]
    fn lookup_round_trips() {
        for (name, mnemonic, ..) in table() {
            let key = Mnemonic::lookup(mnemonic).unwrap_or_else(|| panic!("{name} not found"));
            assert_eq!(key.as_str(), mnemonic);
        }
    }

    #[test]
    fn versions_in_range() {
        for (name, _, version, ..) in table() {
            assert!((1..=MAX_VERSION).contains(&version), "{name} has version {version}");
        }
    }

    #[test]
    fn cost_tiers_are_populated() {
        for key in Mnemonic::ALL {
            if let Cost::Tiered(tiers) = key.def().cost {
                assert!(!tiers.is_empty(), "{} has empty cost tiers", key.as_str());
            }
        }
    }

    #[test]
    fn typed_operands_match_arity() {
        for (name, mnemonic, _, _, kinds) in table() {
            let def = Mnemonic::lookup(mnemonic).unwrap().def();
            match kinds {
                // Block kinds consume every remaining operand.
                ["Uints"] | ["ByteList"] => assert_eq!(def.operands, Arity::Any, "{name}"),
                // `byte` literals may be split into encoding and value.
                ["Bytes"] => assert!(def.operands.accepts(1), "{name}"),
                // The pragma reads `version N`.
                ["Version"] => assert_eq!(def.operands, Arity::Exact(2), "{name}"),
                _ => assert_eq!(def.operands, Arity::Exact(kinds.len()), "{name}"),
            }
        }
    }

    #[test]
    fn stack_depths_are_plausible() {
        for (name, _, _, stack, _) in table() {
            assert!(stack <= 5, "{name} requires {stack} stack values");
        }
        assert_eq!(Mnemonic::EcdsaVerify.def().stack, 5);
    }
}

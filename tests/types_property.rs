#[macro_use]
extern crate proptest;

use proptest::prelude::{Strategy, prop};

use boardflow::types::{BoardId, CardKind, StateMode};

/// Generate valid board names: 1..24 of [a-z0-9_].
fn board_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9_]{1,24}").unwrap()
}

proptest! {
    #[test]
    fn prop_valid_board_names_always_construct(name in board_name_strategy()) {
        let id = BoardId::new(name.clone());
        prop_assert!(id.is_ok());
        let id = id.unwrap();
        prop_assert_eq!(id.as_str(), name.as_str());
    }

    #[test]
    fn prop_names_with_invalid_chars_are_rejected(
        prefix in board_name_strategy(),
        bad in "[A-Z \\-./:@]{1,4}",
        suffix in board_name_strategy(),
    ) {
        let name = format!("{prefix}{bad}{suffix}");
        prop_assert!(BoardId::new(name).is_err());
    }

    #[test]
    fn prop_state_mode_decode_is_total(input in ".*") {
        // Any input decodes to some mode; unknown forms land on the legacy
        // non-ephemeral behavior.
        let mode = StateMode::decode(&input);
        if input != "ephemeral" && input != "default" {
            prop_assert_eq!(mode, StateMode::NonEphemeral);
        }
    }

    #[test]
    fn prop_card_kind_decode_is_total(input in ".*") {
        let kind = CardKind::decode(&input);
        // Round-tripping a decoded kind is stable.
        prop_assert_eq!(CardKind::decode(kind.encode()), kind);
    }

    #[test]
    fn prop_resolved_modes_are_never_default(flag in proptest::prelude::any::<bool>()) {
        for mode in [StateMode::Ephemeral, StateMode::NonEphemeral, StateMode::Default] {
            let resolved = mode.resolve(flag);
            prop_assert!(resolved != StateMode::Default);
        }
    }
}

use lad_core::{keys, ObservableKind, ParamValue, ParameterSet};
use lad_store::cache_file_name;
use proptest::prelude::*;

#[test]
fn unrecognised_keys_collide() {
    // Documents existing behaviour: ad-hoc parameters do not reach the name.
    let base = ParameterSet::new().with(keys::L, 48).with(keys::FILLING, 0.875);
    let extended = base.clone().with("t_perp", 0.5).with("sweeps", 12);
    assert_eq!(
        cache_file_name(ObservableKind::Energy, &base),
        cache_file_name(ObservableKind::Energy, &extended)
    );
}

#[test]
fn recognised_keys_distinguish_names() {
    let base = ParameterSet::new().with(keys::L, 48);
    let other = ParameterSet::new().with(keys::L, 64);
    assert_ne!(
        cache_file_name(ObservableKind::Energy, &base),
        cache_file_name(ObservableKind::Energy, &other)
    );
}

fn entries() -> impl Strategy<Value = Vec<(String, ParamValue)>> {
    (
        8i64..200,
        0.5f64..1.0,
        prop_oneof![Just(1200i64), Just(2000i64), Just(4800i64)],
        any::<bool>(),
    )
        .prop_map(|(size, filling, bond_dim, odd)| {
            let mut list = vec![
                (keys::L.to_string(), ParamValue::Int(size)),
                (keys::FILLING.to_string(), ParamValue::Float(filling)),
                (keys::BOND_DIM.to_string(), ParamValue::Int(bond_dim)),
                ("extra".to_string(), ParamValue::Text("ignored".into())),
            ];
            if odd {
                list.push((keys::ODD_SIZES.to_string(), ParamValue::Flag(true)));
            }
            list
        })
}

proptest! {
    #[test]
    fn insertion_order_does_not_change_name(list in entries(), rotate in 0usize..5) {
        let forward: ParameterSet = list.clone().into_iter().collect();
        let mut shuffled = list;
        let by = rotate % shuffled.len();
        shuffled.rotate_left(by);
        shuffled.reverse();
        let backward: ParameterSet = shuffled.into_iter().collect();
        let name = cache_file_name(ObservableKind::Pairfield, &forward);
        prop_assert_eq!(&name, &cache_file_name(ObservableKind::Pairfield, &backward));
        prop_assert_eq!(name.clone(), cache_file_name(ObservableKind::Pairfield, &forward));
        prop_assert!(name.starts_with("pairfield_"));
        prop_assert!(name.ends_with(".txt"));
    }
}

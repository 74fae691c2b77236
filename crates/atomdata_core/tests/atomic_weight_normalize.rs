use atomdata_core::{
    parse_compositions, prepare_atomic_weights, AtomicWeightKind, Interval, IsotopeRow,
    NormalizeError, RowTable, UncertainValue,
};

const SAMPLE: &str = include_str!("data/compositions_sample.txt");

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 1e-12 * expected.abs().max(1.0),
        "expected {expected}, got {actual}"
    );
}

fn isotope(
    atomic_number: u32,
    mass_number: u32,
    atomic_mass: UncertainValue,
    atomic_weight: Option<AtomicWeightKind>,
) -> IsotopeRow {
    IsotopeRow {
        atomic_number,
        symbol: format!("E{atomic_number}"),
        mass_number,
        atomic_mass,
        atomic_mass_theoretical: false,
        isotopic_composition: None,
        atomic_weight,
        notes: Vec::new(),
    }
}

#[test]
fn interval_and_stable_reference_resolve_to_value_and_std_dev() {
    let mut table = RowTable::new();
    table
        .insert(isotope(
            1,
            1,
            UncertainValue::new(1.0078, 0.0001),
            Some(AtomicWeightKind::Interval(
                Interval::new(1.00000, 1.00200).unwrap(),
            )),
        ))
        .unwrap();
    table
        .insert(isotope(
            2,
            16,
            UncertainValue::new(15.9949, 0.0001),
            Some(AtomicWeightKind::StableMassNumber { mass_number: 16 }),
        ))
        .unwrap();

    let weights = prepare_atomic_weights(&table).unwrap();
    assert_eq!(weights.len(), 2);

    let first = weights.get(1).unwrap();
    assert_close(first.value.unwrap(), 1.00100);
    assert_close(first.std_dev.unwrap(), 0.00100);

    let second = weights.get(2).unwrap();
    assert_eq!(second.value, Some(15.9949));
    assert_eq!(second.std_dev, Some(0.0001));
}

#[test]
fn sample_table_yields_one_record_per_element() {
    let table = parse_compositions(SAMPLE);
    let weights = prepare_atomic_weights(&table).unwrap();

    let elements: Vec<u32> = weights.records().map(|r| r.atomic_number).collect();
    assert_eq!(elements, vec![1, 2, 8, 43, 118]);

    let hydrogen = weights.get(1).unwrap();
    assert_close(hydrogen.value.unwrap(), (1.00784 + 1.00811) / 2.0);
    assert_close(hydrogen.std_dev.unwrap(), (1.00811 - 1.00784) / 2.0);

    let helium = weights.get(2).unwrap();
    assert_close(helium.value.unwrap(), 4.002602);
    assert_close(helium.std_dev.unwrap(), 0.000002);

    let technetium = weights.get(43).unwrap();
    let tc98 = table.get(43, 98).unwrap();
    assert_eq!(technetium.value, Some(tc98.atomic_mass.nominal_value));
    assert_eq!(technetium.std_dev, tc98.atomic_mass.std_dev);

    let oganesson = weights.get(118).unwrap();
    assert_eq!(oganesson.value, None);
    assert_eq!(oganesson.std_dev, None);
}

#[test]
fn direct_weight_without_uncertainty_keeps_null_std_dev() {
    let mut table = RowTable::new();
    table
        .insert(isotope(
            3,
            7,
            UncertainValue::new(7.0160034366, 0.0000000045),
            Some(AtomicWeightKind::Direct(UncertainValue::exact(6.94))),
        ))
        .unwrap();

    let weights = prepare_atomic_weights(&table).unwrap();
    let lithium = weights.get(3).unwrap();
    assert_eq!(lithium.value, Some(6.94));
    assert_eq!(lithium.std_dev, None);
}

#[test]
fn reference_to_missing_isotope_is_an_error() {
    let mut table = RowTable::new();
    table
        .insert(isotope(
            43,
            97,
            UncertainValue::new(96.9063667, 0.0000040),
            Some(AtomicWeightKind::StableMassNumber { mass_number: 98 }),
        ))
        .unwrap();

    let err = prepare_atomic_weights(&table).unwrap_err();
    assert_eq!(
        err,
        NormalizeError::UnresolvedReference {
            atomic_number: 43,
            mass_number: 98
        }
    );
    assert!(err.to_string().contains("mass number 98"));
}

#[test]
fn parse_then_normalize_is_idempotent() {
    let first = prepare_atomic_weights(&parse_compositions(SAMPLE)).unwrap();
    let second = prepare_atomic_weights(&parse_compositions(SAMPLE)).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

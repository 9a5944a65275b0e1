//! End-to-end scenarios against the built-in catalog.

use inpdeck::{
    catalog, Arity, ErrorDomain, ErrorRecord, Granularity, Kind, Record, SuffixCounter, Value,
};
use pretty_assertions::assert_eq;

fn substance(zaid: &str, fraction: f64) -> Record {
    catalog()
        .unwrap()
        .record("substance")
        .unwrap()
        .set("zaid", zaid)
        .set("fraction", fraction)
        .build()
        .unwrap()
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[test]
fn test_cell_option() {
    let record = inpdeck::parse_option("cel", "cel 5").unwrap();
    assert_eq!(record.get("number").and_then(Value::as_i64), Some(5));
    assert_eq!(record.serialize(), "cel 5");
}

#[test]
fn test_material_card() {
    let card = inpdeck::parse_card("m1 1001 -0.6667 8016 -0.3333").unwrap();
    assert_eq!(card.name(), "material");
    assert_eq!(card.suffix(), Some(1));

    let substances = card.get("substances").and_then(Value::as_list).unwrap();
    let pairs: Vec<(u32, f64)> = substances
        .iter()
        .map(|v| {
            let entry = v.as_record().unwrap();
            (
                entry.get("zaid").and_then(Value::as_zaid).unwrap().number(),
                entry.get("fraction").and_then(Value::as_f64).unwrap(),
            )
        })
        .collect();
    assert_eq!(pairs, vec![(1001, -0.6667), (8016, -0.3333)]);
    assert!(card.options().is_empty());
    assert_eq!(card.serialize(), "m1 1001 -0.6667 8016 -0.3333");
}

#[test]
fn test_position_option() {
    let record = inpdeck::parse_option("pos", "pos 0 0 0").unwrap();
    let point = record.get("point").and_then(Value::as_list).unwrap();
    let coords: Vec<f64> = point.iter().filter_map(Value::as_f64).collect();
    assert_eq!(coords, vec![0.0, 0.0, 0.0]);
    assert_eq!(record.serialize(), "pos 0 0 0");
}

#[test]
fn test_built_suffix_outside_range() {
    let err = catalog()
        .unwrap()
        .record("transformation")
        .unwrap()
        .suffix(1000)
        .set("displacement", vec![0.0, 0.0, 1.0])
        .build()
        .unwrap_err();
    assert!(err.is_semantics());
    assert_eq!(err.attribute.as_deref(), Some("suffix"));
    assert_eq!(err.granularity, Granularity::Card);
}

#[test]
fn test_choice_prefers_integer_then_inline_transform() {
    let inline = inpdeck::parse_option("trcl", "trcl 0 0 1").unwrap();
    let transform = inline.get("transform").and_then(Value::as_record).unwrap();
    assert_eq!(transform.name(), "transform");
    assert_eq!(transform.get("rotation"), Some(&Value::List(vec![])));

    let plain = inpdeck::parse_option("trcl", "trcl 5").unwrap();
    assert_eq!(plain.get("transform").and_then(Value::as_i64), Some(5));
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_choice_returns_earlier_alternative() {
    let registry = catalog().unwrap();
    let int_first = Kind::choice([Kind::Integer, Kind::Real]);
    let real_first = Kind::choice([Kind::Real, Kind::Integer]);
    assert!(matches!(registry.parse_value(&int_first, "5").unwrap(), Value::Integer(_)));
    assert!(matches!(registry.parse_value(&real_first, "5").unwrap(), Value::Real(_)));
}

#[test]
fn test_repeated_arity() {
    let registry = catalog().unwrap();
    let value = registry
        .parse_value(&Kind::repeated(Kind::Text, Arity::one_or_more()), "a b c")
        .unwrap();
    let words: Vec<&str> = value.as_list().unwrap().iter().filter_map(Value::as_str).collect();
    assert_eq!(words, vec!["a", "b", "c"]);

    let err = registry
        .parse_value(&Kind::repeated(Kind::Text, Arity::one_or_more()), "")
        .unwrap_err();
    assert!(err.is_syntax());

    let empty = registry
        .parse_value(&Kind::repeated(Kind::Text, Arity::zero_or_more()), "")
        .unwrap();
    assert_eq!(empty, Value::List(vec![]));
}

#[test]
fn test_option_suffix_range_is_semantics() {
    let ok = inpdeck::parse_option("wwn", "wwn999:n 0.5").unwrap();
    assert_eq!(ok.suffix(), Some(999));

    let err = inpdeck::parse_option("wwn", "wwn1000:n 0.5").unwrap_err();
    assert!(err.is_semantics());
    assert_eq!(err.granularity, Granularity::Option);
    assert_eq!(err.attribute.as_deref(), Some("suffix"));
}

#[test]
fn test_missing_designator_is_semantics() {
    let err = inpdeck::parse_option("imp", "imp 1").unwrap_err();
    assert!(err.is_semantics());
    assert_eq!(err.attribute.as_deref(), Some("designator"));

    let card_err = inpdeck::parse_card("imp 1 1 0").unwrap_err();
    assert!(card_err.is_semantics());
}

#[test]
fn test_default_suffixes_increase() {
    let registry = catalog().unwrap();
    let mut counter = SuffixCounter::new();
    let suffixes: Vec<u64> = (0..5)
        .map(|_| {
            registry
                .record("material")
                .unwrap()
                .set("substances", vec![substance("1001", 1.0)])
                .build_with(&mut counter)
                .unwrap()
                .suffix()
                .unwrap()
        })
        .collect();
    assert!(suffixes.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(suffixes.len(), 5);
}

#[test]
fn test_explicit_suffix_is_not_reused() {
    let registry = catalog().unwrap();
    let mut counter = SuffixCounter::new();
    let explicit = registry
        .record("material")
        .unwrap()
        .suffix(7)
        .set("substances", vec![substance("8016", 1.0)])
        .build_with(&mut counter)
        .unwrap();
    let next = registry
        .record("material")
        .unwrap()
        .set("substances", vec![substance("1001", 1.0)])
        .build_with(&mut counter)
        .unwrap();
    assert_eq!(explicit.suffix(), Some(7));
    assert_eq!(next.suffix(), Some(8));
}

// ============================================================================
// Cards with options
// ============================================================================

#[test]
fn test_source_definition() {
    let card = inpdeck::parse_card("sdef pos 0 0 0 erg d1 cel 5 par n").unwrap();
    let names: Vec<&str> = card.options().iter().map(Record::name).collect();
    assert_eq!(
        names,
        vec!["source_position", "source_energy", "source_cell", "source_particle"]
    );
    assert_eq!(card.serialize(), "sdef pos 0 0 0 erg d1 cel 5 par n");

    let spread = inpdeck::parse_card("SDEF POS D2 ERG 14.1").unwrap();
    assert_eq!(spread.options()[0].name(), "source_position_distribution");
    assert_eq!(spread.serialize(), "sdef pos d2 erg 14.1");
}

#[test]
fn test_source_with_hundreds_of_variables() {
    let text = format!("sdef{}", " cel 5".repeat(300));
    let card = inpdeck::parse_card(&text).unwrap();
    assert_eq!(card.options().len(), 300);
    assert_eq!(card.serialize(), text);
}

#[test]
fn test_source_variable_out_of_range() {
    let err = inpdeck::parse_card("sdef erg -1").unwrap_err();
    assert!(err.is_semantics());
    assert_eq!(err.granularity, Granularity::Option);
    assert_eq!(err.attribute.as_deref(), Some("energy"));
}

#[test]
fn test_material_keywords() {
    let card = inpdeck::parse_card("m20 92235.80c 0.03 92238.80c 0.97 nlib 80c gas 1").unwrap();
    assert_eq!(card.options().len(), 2);
    assert_eq!(
        card.option("gas").and_then(|o| o.get("flag")).and_then(Value::as_i64),
        Some(1)
    );

    let err = inpdeck::parse_card("m20 1001 1 gas 2").unwrap_err();
    assert!(err.is_semantics());
    assert_eq!(err.attribute.as_deref(), Some("flag"));

    let err = inpdeck::parse_card("m20 1001 1 cel 2").unwrap_err();
    assert!(err.is_syntax());
}

#[test]
fn test_cutoffs_keep_jumps() {
    let card = inpdeck::parse_card("cut:n 2j 0.001").unwrap();
    let limits = card.get("limits").and_then(Value::as_list).unwrap();
    assert!(limits[0].is_jump());
    assert_eq!(card.serialize(), "cut:n 2j 0.001");

    let err = inpdeck::parse_card("cut:n 1 2 3 4 5 6").unwrap_err();
    assert!(err.is_syntax());
}

#[test]
fn test_card_dispatch_by_longest_mnemonic() {
    let mode = inpdeck::parse_card("mode n p").unwrap();
    assert_eq!(mode.name(), "mode");
    let degrees = inpdeck::parse_card("*tr3 0 0 0 90 0 90").unwrap();
    assert_eq!(degrees.name(), "transformation_degrees");
    assert_eq!(degrees.suffix(), Some(3));
}

// ============================================================================
// Diagnostics and errors
// ============================================================================

#[test]
fn test_diagnose_collects_multiple_violations() {
    let registry = catalog().unwrap();
    let builder = registry
        .record("transformation_degrees")
        .unwrap()
        .suffix(5000)
        .set("displacement", vec![0.0, 0.0])
        .set("rotation", vec![0.0, 270.0]);
    let errors = builder.diagnose();
    let attrs: Vec<Option<&str>> = errors.iter().map(|e| e.attribute.as_deref()).collect();
    // Values that cannot be read come first, then the record checks.
    assert_eq!(attrs, vec![Some("displacement"), Some("suffix"), Some("rotation")]);
    assert!(errors[0].is_syntax());
    assert!(errors[1].is_semantics());
    assert!(errors[2].is_semantics());
    assert!(builder.build().is_err());
}

#[test]
fn test_unknown_attribute_and_schema() {
    let registry = catalog().unwrap();
    let err = registry
        .record("mode")
        .unwrap()
        .set("particle", "n")
        .build()
        .unwrap_err();
    assert_eq!(err.attribute.as_deref(), Some("particle"));
    assert!(registry.record("no_such_card").is_err());
}

#[test]
fn test_unmatched_card() {
    let err = inpdeck::parse_card("zzz 1 2 3").unwrap_err();
    assert!(err.is_syntax());
    assert_eq!(err.granularity, Granularity::Card);
    assert_eq!(err.domain, ErrorDomain::Inp);
}

#[test]
fn test_error_serializes_to_json() {
    let err = inpdeck::parse_option("wwn", "wwn1000:n 0.5").unwrap_err();
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["domain"], "inp");
    assert_eq!(json["stage"], "semantics");
    assert_eq!(json["granularity"], "option");
    assert_eq!(json["attribute"], "suffix");
    let back: ErrorRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, err);
}

#[test]
fn test_error_context_is_truncated() {
    let text = (0..20).map(|i| format!("{} 1", 1001 + i)).collect::<Vec<_>>().join("\n");
    // The trailing odd token leaves an incomplete substance.
    let err = inpdeck::parse_card(&format!("m1 {}\n1001", text)).unwrap_err();
    assert!(err.is_syntax());
    assert!(err.context.lines().count() <= inp_types::CONTEXT_LINE_BUDGET + 1);
    assert!(err.context.ends_with(inp_types::ELLIPSIS));
}

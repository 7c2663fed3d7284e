use pretty_assertions::assert_eq;
use quill_core::Decimal;
use quill_parser::parse_program_as_seq;
use quill_transform::preprocess::{preprocess, PreprocessError, SELF_EXTERN};

const REGISTRY: &str = r#"
; name registry with fee accounting
(data owner)
(data (access fees 16))
(data (fun (access records 1024) holder (access tags 4) expiry))
(data (access events))
(data counter)

(extern (: oracle (list price:i (: quote ss) subscribe)))

(def (init) (sstore owner (caller)))
(def (shared) (set fee (sload 1)))

(def (register name:s years)
  (seq (sstore (add 2 years) name) (return 1)))

(def (lookup key) (return (sload key)))

(def (batch ids:a tags:a memo:s)
  (return (mload ids)))
"#;

#[test]
fn test_registry_storage_layout() {
    let result = preprocess(&parse_program_as_seq(REGISTRY, 0).unwrap()).unwrap();
    let storage = &result.storage;

    let offset = |path: &str| storage.get(path).unwrap().offset.to_string();
    assert_eq!(offset("owner"), "0");
    assert_eq!(offset("fees"), "1");
    assert_eq!(offset("records"), "17");
    assert_eq!(offset("records.holder"), "0");
    assert_eq!(offset("records.tags"), "1");
    assert_eq!(offset("records.expiry"), "5");

    let records = storage.get("records").unwrap();
    assert_eq!(records.footprint(), Decimal::from(6u64 * 1024));

    // The unsized log takes no static room, so the counter lands on it.
    let events_at = 17 + 6 * 1024;
    assert_eq!(offset("events"), events_at.to_string());
    assert_eq!(offset("counter"), events_at.to_string());

    let third_tag = storage
        .element_address("records.tags", &[Decimal::from(2u64)])
        .unwrap();
    assert_eq!(third_tag, Decimal::from(17u64 + 1 + 2));
}

#[test]
fn test_registry_dispatch() {
    let result = preprocess(&parse_program_as_seq(REGISTRY, 0).unwrap()).unwrap();
    let externs = &result.externs;

    assert_eq!(externs.dispatch_index(SELF_EXTERN, "register"), Some(0));
    assert_eq!(externs.dispatch_index(SELF_EXTERN, "lookup"), Some(1));
    assert_eq!(externs.dispatch_index(SELF_EXTERN, "batch"), Some(2));
    assert_eq!(externs.signature("oracle", "quote"), Some("ss"));
    assert_eq!(externs.global_index("subscribe"), Some(2));

    let text = result.program.to_string();
    assert!(text.starts_with("(seq (set fee (sload 1)) (sstore owner (caller)) (~return 0"));
    assert!(text.contains(
        "(declare _len_ids _len_tags _len_memo) (calldatacopy (ref _len_ids) 1 96) (with _temp2_offset 97"
    ));
    assert!(text.contains("(declare _len_name years) (calldatacopy (ref _len_name) 1 64)"));
    assert!(text.contains("(if (eq (get __funid) 1) (seq (comment \"FUNCTION lookup\") (declare key) (calldatacopy (ref key) 1 32) (return (sload key))))"));
}

#[test]
fn test_error_points_at_declaration() {
    let src = "(data a)\n(def (f x:z) (stop))";
    let err = preprocess(&parse_program_as_seq(src, 0).unwrap()).unwrap_err();
    match &err {
        PreprocessError::InvalidParameterTag { tag, span } => {
            assert_eq!(tag, "z");
            assert_eq!(span.start, 17);
        }
        other => panic!("unexpected error: {other}"),
    }
}

use indoc::indoc;
use safe_saphyr::{load, load_all, load_with_options, Allowlist, Error, Options, Value};

#[test]
fn empty_streams_load_as_null() {
    let allowlist = Allowlist::new();
    assert_eq!(load("", &allowlist).unwrap(), Value::Null);
    assert_eq!(load("# only a comment\n", &allowlist).unwrap(), Value::Null);
    assert_eq!(load("---\n", &allowlist).unwrap(), Value::Null);
    assert!(load_all("", &allowlist).unwrap().is_empty());
}

#[test]
fn single_document_loader_rejects_a_second_document() {
    let yaml = indoc! {"
        a: 1
        ---
        b: 2
    "};
    let err = load(yaml, &Allowlist::new()).unwrap_err();
    assert!(matches!(err, Error::MultipleDocuments { .. }), "{err:?}");
    assert!(err.location().is_some_and(|l| l.line() >= 2), "{err:?}");
}

#[test]
fn load_all_returns_every_document_in_order() {
    let yaml = indoc! {"
        --- 1
        --- [a, b]
        --- {k: v}
        ...
    "};
    let documents = load_all(yaml, &Allowlist::new()).unwrap();
    assert_eq!(documents.len(), 3);
    assert_eq!(documents[0], Value::Int(1));
    assert_eq!(documents[1].as_sequence().map(<[_]>::len), Some(2));
    assert_eq!(documents[2].get("k"), Some(&Value::from("v")));
}

#[test]
fn one_bad_document_fails_the_whole_stream() {
    let yaml = "--- 1\n--- !evil x\n--- 3\n";
    let err = load_all(yaml, &Allowlist::new()).unwrap_err();
    assert!(matches!(err, Error::DisallowedTag { .. }), "{err:?}");
}

#[test]
fn errors_point_at_the_offending_node() {
    let err = load("ok: 1\nbad: !evil x\n", &Allowlist::new()).unwrap_err();
    assert!(matches!(&err, Error::DisallowedTag { tag, .. } if tag == "!evil"));
    assert_eq!(err.location().map(|l| l.line()), Some(2));
    assert!(err.to_string().contains("!evil"), "{err}");
}

#[test]
fn syntax_errors_are_parse_errors_with_a_location() {
    let err = load("a: [1, 2\nb: 3\n", &Allowlist::new()).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }), "{err:?}");
    assert!(err.location().is_some());
}

#[test]
fn budget_report_callback_sees_the_stream() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static EVENTS: AtomicUsize = AtomicUsize::new(0);
    fn record(report: &safe_saphyr::BudgetReport) {
        EVENTS.store(report.events, Ordering::SeqCst);
    }

    let options = Options {
        budget_report: Some(record),
        ..Options::default()
    };
    load_with_options("[1, 2, 3]", &Allowlist::new(), options).unwrap();
    assert!(EVENTS.load(Ordering::SeqCst) > 0);
}

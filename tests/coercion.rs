use chrono::{Datelike, Timelike};
use indoc::indoc;
use safe_saphyr::{load, Allowlist, Error, Value};

fn field(yaml: &str, key: &str) -> Value {
    load(yaml, &Allowlist::new())
        .unwrap()
        .get(key)
        .cloned()
        .unwrap_or_else(|| panic!("no key {key} in {yaml:?}"))
}

#[test]
fn quoted_scalars_are_never_guessed() {
    let yaml = indoc! {r#"
        single: '123'
        double: "true"
        literal: |
          42
        folded: >
          ~
        tagged: !!int "7"
    "#};
    let value = load(yaml, &Allowlist::new()).unwrap();
    assert_eq!(value.get("single"), Some(&Value::from("123")));
    assert_eq!(value.get("double"), Some(&Value::from("true")));
    assert_eq!(value.get("literal"), Some(&Value::from("42\n")));
    assert_eq!(value.get("folded"), Some(&Value::from("~\n")));
    assert_eq!(value.get("tagged"), Some(&Value::from("7")));
}

#[test]
fn hex_prefix_without_digits_stays_a_string() {
    assert_eq!(field("v: 0x_\n", "v"), Value::from("0x_"));
    assert_eq!(field("v: 0b,\n", "v"), Value::from("0b,"));
    assert_eq!(field("v: 0x1_F\n", "v"), Value::Int(31));
}

#[test]
fn integers_with_separators_and_radix_prefixes() {
    let yaml = indoc! {"
        plain: 1_000
        commas: 1,000
        negative: -42
        hex: 0xFF
        octal: 0o17
        legacy_octal: 017
        binary: 0b101
        huge: 123456789012345678901234567890
    "};
    let value = load(yaml, &Allowlist::new()).unwrap();
    assert_eq!(value.get("plain"), Some(&Value::Int(1000)));
    assert_eq!(value.get("commas"), Some(&Value::Int(1000)));
    assert_eq!(value.get("negative"), Some(&Value::Int(-42)));
    assert_eq!(value.get("hex"), Some(&Value::Int(255)));
    assert_eq!(value.get("octal"), Some(&Value::Int(15)));
    assert_eq!(value.get("legacy_octal"), Some(&Value::Int(15)));
    assert_eq!(value.get("binary"), Some(&Value::Int(5)));
    assert_eq!(
        value.get("huge"),
        Some(&Value::from("123456789012345678901234567890"))
    );
}

#[test]
fn yaml_1_1_booleans_and_nulls() {
    let yaml = indoc! {"
        a: yes
        b: Off
        c: TRUE
        d: ~
        e:
        f: y
        g: NULL
    "};
    let value = load(yaml, &Allowlist::new()).unwrap();
    assert_eq!(value.get("a"), Some(&Value::Bool(true)));
    assert_eq!(value.get("b"), Some(&Value::Bool(false)));
    assert_eq!(value.get("c"), Some(&Value::Bool(true)));
    assert_eq!(value.get("d"), Some(&Value::Null));
    assert_eq!(value.get("e"), Some(&Value::Null));
    assert_eq!(value.get("f"), Some(&Value::from("y")));
    assert_eq!(value.get("g"), Some(&Value::Null));
}

#[test]
fn floats_and_special_values() {
    assert_eq!(field("v: 6.8523015e+5\n", "v"), Value::Float(685_230.15));
    assert_eq!(field("v: 685_230.15\n", "v"), Value::Float(685_230.15));
    assert_eq!(field("v: -.inf\n", "v"), Value::Float(f64::NEG_INFINITY));
    assert!(field("v: .NaN\n", "v").as_f64().is_some_and(f64::is_nan));
    assert_eq!(field("v: nan\n", "v"), Value::from("nan"));
    assert_eq!(field("v: !!float 3\n", "v"), Value::Float(3.0));
}

#[test]
fn timestamps_in_every_form() {
    let yaml = indoc! {"
        canonical: 2001-12-15T02:59:43.1Z
        iso8601: 2001-12-14t21:59:43.10-05:00
        spaced: 2001-12-14 21:59:43.10 -5
        date: 2002-12-14
    "};
    let value = load(yaml, &Allowlist::new()).unwrap();
    let Some(Value::Timestamp(canonical)) = value.get("canonical") else {
        panic!("canonical: {:?}", value.get("canonical"));
    };
    assert_eq!(value.get("iso8601"), Some(&Value::Timestamp(*canonical)));
    assert_eq!(value.get("spaced"), Some(&Value::Timestamp(*canonical)));
    assert_eq!(canonical.hour(), 2);

    let Some(Value::Date(date)) = value.get("date") else {
        panic!("date: {:?}", value.get("date"));
    };
    assert_eq!((date.year(), date.month(), date.day()), (2002, 12, 14));
}

#[test]
fn malformed_tagged_scalars_are_errors() {
    for yaml in [
        "v: !!int twelve\n",
        "v: !!bool maybe\n",
        "v: !!float abc\n",
        "v: !!timestamp 2001-02-30\n",
        "v: !!null nothing\n",
        "v: !!binary '*not base64*'\n",
    ] {
        let err = load(yaml, &Allowlist::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedScalar { .. }), "{yaml:?} -> {err:?}");
        assert_eq!(err.location().map(|l| l.line()), Some(1), "{yaml:?}");
    }
}

#[test]
fn binary_scalars_are_decoded() {
    let yaml = indoc! {"
        greeting: !!binary |
          SGVsbG8s
          IFdvcmxkIQ==
    "};
    let Value::Binary(bytes) = field(yaml, "greeting") else {
        panic!("expected binary");
    };
    assert_eq!(bytes, b"Hello, World!");
}

#[test]
fn str_tag_keeps_text() {
    assert_eq!(field("v: !!str 123\n", "v"), Value::from("123"));
    assert_eq!(
        load("v: !str 1.5\n", &Allowlist::ruby_compat()).unwrap().get("v"),
        Some(&Value::from("1.5"))
    );
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use safe_saphyr::{Allowlist, ClassDescriptor, Value, load_all};

// With no classes registered, any document that names a class must be
// rejected; with a record class registered, only that class may appear.
fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    let s = String::from_utf8_lossy(data);

    let _ = load_all(&s, &Allowlist::new());

    let mut allowlist = Allowlist::new();
    if allowlist
        .register_classes([ClassDescriptor::record("Point")])
        .is_err()
    {
        return;
    }
    if let Ok(documents) = load_all(&s, &allowlist) {
        for document in documents {
            assert_only_point(&document);
        }
    }
});

fn assert_only_point(value: &Value) {
    match value {
        Value::Object(object) => {
            assert_eq!(object.class(), "Point");
            assert_only_point(object.payload());
        }
        Value::Sequence(items) => items.iter().for_each(assert_only_point),
        Value::Mapping(mapping) => {
            for (key, value) in mapping {
                assert_only_point(key);
                assert_only_point(value);
            }
        }
        Value::Set(set) => {
            assert_eq!(set.class(), None, "only core sets may appear");
            set.iter().for_each(assert_only_point);
        }
        Value::Class(name) => assert_eq!(name, "Point"),
        Value::Singleton(_) => panic!("unregistered singleton produced: {value:?}"),
        _ => {}
    }
}

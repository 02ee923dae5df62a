#![no_main]

use libfuzzer_sys::fuzz_target;
use safe_saphyr::{Allowlist, Options, ResolveLimits, load_all_with_options};

// Biases inputs toward anchors, aliases and merge keys (<<), with tight
// limits so that expansion attacks are cut short rather than timing out.
fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    let s = String::from_utf8_lossy(data);

    let options = || Options {
        limits: ResolveLimits {
            max_depth: 64,
            max_resolved_nodes: 50_000,
            max_alias_expansions: 5_000,
            max_resolved_scalar_bytes: 1024 * 1024,
        },
        ..Options::default()
    };
    let allowlist = Allowlist::new();

    let yaml_alias = format!("a: &A {s}\nb: *A\nseq: &S [*A, *A]\nseq_alias: [*S, *S]\n");
    let yaml_merge = format!(
        "base1: &B1 {{k: 1, v: {s}}}\nbase2: &B2 {{k: 2, w: {s}}}\nmerged: {{<<: [*B1, *B2], extra: 3}}\n"
    );

    let _ = load_all_with_options(&yaml_alias, &allowlist, options());
    let _ = load_all_with_options(&yaml_merge, &allowlist, options());
    let _ = load_all_with_options(&s, &allowlist, options());
});

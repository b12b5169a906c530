//! E2E: pretty printing as a weak inverse of parsing.
//!
//! `parse(pretty(parse(src)))` must produce the same system as
//! `parse(src)`. The comparison goes through the serde model so every
//! corner of the AST, the type registry, and the symbol table counts.

mod common;

use common::parse_text;
use tack_base::ErrorLog;
use tack_syntax::{parse_xta, PrettyPrinter, StartSymbol};

fn roundtrip(source: &str) {
    let direct = parse_text(source);

    let mut printer = PrettyPrinter::new();
    let mut log = ErrorLog::new();
    let status = parse_xta(source, &mut printer, &mut log, true, StartSymbol::XtaFile);
    assert_eq!(status, 0, "diagnostics: {:?}", log.diagnostics());
    let canonical = printer.finish();

    let reparsed = parse_text(&canonical);
    assert_eq!(
        serde_json::to_value(&direct).unwrap(),
        serde_json::to_value(&reparsed).unwrap(),
        "canonical text:\n{}",
        canonical
    );
}

#[test]
fn declarations_round_trip() {
    roundtrip(
        r#"
const int N = 4;
int[0,10] level = 3;
bool flags[4];
clock x;
chan c;
urgent chan u;
broadcast chan b;
typedef int[0,3] small_t;
small_t s;
process P() { state w; init w; }
I = P();
system I;
"#,
    );
}

#[test]
fn structs_and_initialisers_round_trip() {
    roundtrip(
        r#"
typedef struct { int lo; int hi; } range_t;
range_t r = { lo: 1, 5 };
int grid[2][3];
process P() { state w; init w; }
I = P();
system I;
"#,
    );
}

#[test]
fn functions_round_trip() {
    roundtrip(
        r#"
int count;
int bump(int by) {
    int old = count;
    if (by > 0)
        count = count + by;
    else
        count = count <? 0;
    while (count > 100) {
        count--;
    }
    for (i : int[0,3])
        count = count + i;
    do
        count++;
    while (count < 0);
    return old;
}
process P() { state w; init w; }
I = P();
system I;
"#,
    );
}

#[test]
fn templates_and_edges_round_trip() {
    roundtrip(
        r#"
chan c[3];
int x;
process Worker(int id) {
    clock t;
    state idle, busy{t <= 7}, done;
    commit done;
    urgent idle;
    init idle;
    trans
        idle -> busy {
            select i : int[0,2];
            guard x < 5;
            sync c[i]?;
            assign x = x + 1, t = 0;
        },
        busy -u-> done {
            guard t >= 2;
        },
        done -> idle { };
}
W0 = Worker(0);
W1 = Worker(1);
system W0 < W1;
"#,
    );
}

#[test]
fn priorities_and_progress_round_trip() {
    roundtrip(
        r#"
chan a, b;
int x;
progress { x; }
chan priority a < b, default;
process P() { state w; init w; }
I = P();
system I;
"#,
    );
}

#[test]
fn quantified_guards_round_trip() {
    roundtrip(
        r#"
bool seen[4];
process P() {
    state w, v;
    init w;
    trans
        w -> v {
            guard forall (i : int[0,3]) !seen[i];
        },
        v -> w {
            guard exists (i : int[0,3]) seen[i];
        };
}
I = P();
system I;
"#,
    );
}

#[test]
fn parsed_systems_serialize_to_json() {
    let system = parse_text(
        r#"
int x = 1;
process P() { state w; init w; }
I = P();
system I;
"#,
    );
    let value = serde_json::to_value(&system).unwrap();
    assert!(value.get("templates").is_some());
    assert!(value.get("symbols").is_some());
    assert!(value.get("types").is_some());
    assert_eq!(value["instantiations"].as_array().unwrap().len(), 1);
}

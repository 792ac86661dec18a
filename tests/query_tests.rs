// tests/query_tests.rs - where clauses, scopes and fragment alignment through the public API
use gloss::{
    assemble, CompositeBuilder, Condition, Fragment, GlossConfig, LineScanner, ParsedLine,
    Placement, QueryOptions, Scope, WhereClause,
};
use gloss::driver::{DriverRegistry, PostfixDriver};
use std::io::Cursor;
use std::path::Path;

fn bound(pairs: &[(&str, &str)]) -> ParsedLine {
    let mut line = ParsedLine::new();
    for (name, value) in pairs {
        line.insert(&Scope::Global, *name, Some(value.to_string()));
    }
    line
}

#[test]
fn test_single_test_selects_and_drops() {
    let clause = WhereClause::new(vec![Condition::test("a", "1", true)]);
    assert!(clause.evaluate(&bound(&[("a", "1")])));
    assert!(!clause.evaluate(&bound(&[("a", "2")])));
}

#[test]
fn test_or_escape_selects_despite_failing_second_chain() {
    let clause = WhereClause::new(vec![
        Condition::test("a", "1", true),
        Condition::Or,
        Condition::test("b", "2", true),
    ]);
    assert!(clause.evaluate(&bound(&[("a", "1"), ("b", "9")])));
}

#[test]
fn test_negation_token() {
    let clause = WhereClause::parse(&["var!=value"]).unwrap();
    assert_eq!(clause.conditions(), [Condition::test("var", "value", false)]);
    assert!(clause.evaluate(&bound(&[("var", "other")])));
    assert!(!clause.evaluate(&bound(&[("var", "value")])));
}

#[test]
fn test_driver_scope_resolution() {
    let mut line = ParsedLine::new();
    line.insert(&Scope::Driver("postfix".into()), "queueid", Some("ABC".into()));
    line.set_active_driver(Some("postfix".into()));

    assert_eq!(line.lookup("queueid"), Some("ABC"));
    assert_eq!(line.lookup("other.queueid"), None);

    let clause = WhereClause::parse(&["other.queueid=ABC"]).unwrap();
    assert!(!clause.evaluate(&line));
    let clause = WhereClause::parse(&["queueid=ABC"]).unwrap();
    assert!(clause.evaluate(&line));
}

#[test]
fn test_absent_pid_satisfies_negated_test() {
    let pattern = assemble(&GlossConfig::default(), &[]).unwrap();
    let line = pattern.bind(&pattern.captures("Oct 12 03:14:15 gw kernel: boot").unwrap());
    assert!(WhereClause::parse(&["pid!=1"]).unwrap().evaluate(&line));
    assert!(!WhereClause::parse(&["pid=1"]).unwrap().evaluate(&line));
}

#[test]
fn test_group_count_equals_key_count_with_drivers() {
    let mut registry = DriverRegistry::with_builtins();
    registry
        .load_yaml(
            Path::new("drivers.yaml"),
            "drivers:\n  - name: tagged\n    fragments:\n      - pattern: '\\[([a-z]+)\\] '\n        keys: [tag]\n      - pattern: '<([0-9]+)>'\n        keys: [prio]\n        placement: before\n",
        )
        .unwrap();
    let drivers = registry.select(&["postfix", "tagged"]).unwrap();
    let config = GlossConfig::from_parts(QueryOptions {
        hostnames: vec!["h1".into(), "h2".into()],
        regexps: vec!["a".into(), "b".into()],
        ..Default::default()
    })
    .unwrap();
    let pattern = assemble(&config, &drivers).unwrap();

    let expected: usize = drivers
        .iter()
        .flat_map(|driver| driver.fragments())
        .map(|fragment| fragment.keys().len())
        .sum::<usize>()
        + 7;
    assert_eq!(pattern.keys().len(), expected);
    assert_eq!(pattern.group_count(), expected);

    let caps = pattern
        .captures("<30>Oct 12 03:14:15 h2 app[7]: [web] b happened")
        .unwrap();
    let line = pattern.bind(&caps);
    assert_eq!(line.active_driver(), Some("tagged"));
    assert_eq!(line.lookup("prio"), Some("30"));
    assert_eq!(line.lookup("tag"), Some("web"));
    assert_eq!(line.lookup("logentry"), Some("b happened"));
}

#[test]
fn test_misalignment_is_preserved() {
    let mut builder = CompositeBuilder::new();
    builder
        .fragment(&Fragment::new("(x)(y)", ["xy"]), &Scope::Global)
        .unwrap()
        .fragment(
            &Fragment::new("(z)", ["z"]).with_placement(Placement::After),
            &Scope::Global,
        )
        .unwrap();
    let pattern = builder.build().unwrap();
    assert!(!pattern.is_aligned());

    let caps = pattern.captures("xyz").unwrap();
    let line = pattern.bind(&caps);
    assert_eq!(line.lookup("xy"), Some("x"));
    assert_eq!(line.lookup("z"), Some("y"));
}

#[test]
fn test_end_to_end_select_all() {
    let config = GlossConfig::default();
    let pattern = assemble(&config, &[]).unwrap();
    let mut scanner = LineScanner::new(&config, &pattern);
    let mut output = Vec::new();
    scanner
        .scan_reader(
            "syslog",
            Cursor::new("Oct 12 03:14:15 mail1 postfix/smtp[1234]: message-id=XYZ\n"),
            &mut output,
        )
        .unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "month=Oct\nday=12\ntime=03:14:15\nhost=mail1\nproc=postfix/smtp\npid=1234\nlogentry=message-id=XYZ\n\n"
    );
    assert_eq!(scanner.finish().exit_code(), 0);
}

#[test]
fn test_unreadable_and_valid_source() {
    let config = GlossConfig::default();
    let postfix = PostfixDriver;
    let pattern = assemble(&config, &[&postfix]).unwrap();
    let mut scanner = LineScanner::new(&config, &pattern);
    let mut output = Vec::new();
    scanner
        .scan_source(Path::new("/nonexistent/gloss/mail.log"), &mut output)
        .unwrap();
    scanner
        .scan_reader(
            "mail.log",
            Cursor::new("Oct 12 03:14:17 mail2 postfix/smtp[1235]: 3F2A1B4C5D: status=sent\n"),
            &mut output,
        )
        .unwrap();

    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("postfix.queueid=3F2A1B4C5D\n"));
    assert!(output.contains("logentry=status=sent\n"));
    assert_eq!(scanner.finish().exit_code(), 1);
}

// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine-level tests over a standalone test schema (a staff roster),
//! covering the serialisation and structural laws: parse/print round
//! trips, copy independence, selectors and identifier matching, element
//! masks, the three partial-write cases, and partial deletes.

use eebus::data::{self, json, ops, DataCfg, DataKind, EnumTable, Value};

static GRADE_TABLE: EnumTable = EnumTable {
    name: "grade",
    entries: &[("junior", 0), ("senior", 1), ("principal", 2)],
};

static ADDRESS_CFG: [DataCfg; 2] = [
    DataCfg::new("street", DataKind::String),
    DataCfg::new("city", DataKind::String),
];

static ADDRESS_ELEMENTS_CFG: [DataCfg; 2] = [
    DataCfg::new("street", DataKind::Tag),
    DataCfg::new("city", DataKind::Tag),
];

static EMPLOYEE_CFG: [DataCfg; 5] = [
    DataCfg::identifier("employeeId", DataKind::U32),
    DataCfg::new("name", DataKind::String),
    DataCfg::new("grade", DataKind::Enum(&GRADE_TABLE)),
    DataCfg::new("address", DataKind::Sequence(&ADDRESS_CFG)),
    DataCfg::new("hired", DataKind::Date),
];

static EMPLOYEE_ELEMENTS_CFG: [DataCfg; 5] = [
    DataCfg::new("employeeId", DataKind::Tag),
    DataCfg::new("name", DataKind::Tag),
    DataCfg::new("grade", DataKind::Tag),
    DataCfg::new("address", DataKind::Sequence(&ADDRESS_ELEMENTS_CFG)),
    DataCfg::new("hired", DataKind::Tag),
];

static EMPLOYEE_SELECTORS_CFG: [DataCfg; 2] = [
    DataCfg::identifier("employeeId", DataKind::U32),
    DataCfg::new("grade", DataKind::Enum(&GRADE_TABLE)),
];

static EMPLOYEE_ITEM_CFG: DataCfg = DataCfg::new("", DataKind::Sequence(&EMPLOYEE_CFG));

static EMPLOYEE_LIST_CFG: DataCfg =
    DataCfg::new("employee", DataKind::List(&EMPLOYEE_ITEM_CFG));

static ROSTER_CFG: DataCfg = DataCfg::new("roster", DataKind::Container(&EMPLOYEE_LIST_CFG));

static EMPLOYEE_ROOT: DataCfg = DataCfg::new("employee", DataKind::Sequence(&EMPLOYEE_CFG));

static SELECTORS_ROOT: DataCfg =
    DataCfg::new("selectors", DataKind::Sequence(&EMPLOYEE_SELECTORS_CFG));

static ELEMENTS_ROOT: DataCfg =
    DataCfg::new("elements", DataKind::Sequence(&EMPLOYEE_ELEMENTS_CFG));

const ROSTER_TXT: &str = concat!(
    r#"{"roster":[{"employee":["#,
    r#"[{"employeeId":1},{"name":"Ada"},{"grade":"principal"},"#,
    r#"{"address":[{"street":"1 Loop Road"},{"city":"London"}]},{"hired":"2015-06-01"}],"#,
    r#"[{"employeeId":2},{"name":"Brian"},{"grade":"senior"},"#,
    r#"{"address":[{"street":"9 Ring Road"},{"city":"Leeds"}]},{"hired":"2019-02-11"}]"#,
    r#"]}]}"#
);

fn parse_roster() -> Option<Value> {
    json::parse(&ROSTER_CFG, ROSTER_TXT).unwrap()
}

fn roster_items(roster: &Value) -> &[Value] {
    roster
        .as_seq()
        .and_then(|slots| slots[0].as_ref())
        .and_then(Value::as_list)
        .unwrap()
}

fn employee_field<'v>(item: &'v Value, index: usize) -> Option<&'v Value> {
    item.seq_child(index)
}

#[test]
fn parse_print_round_trip_is_canonical() {
    let roster = parse_roster();
    assert_eq!(json::print(&ROSTER_CFG, roster.as_ref()).unwrap(), ROSTER_TXT);

    // Whitespace and member order do not survive; the schema dictates the
    // canonical text.
    let shuffled = r#"{ "roster": [ { "employee": [ [ {"name":"Ada"}, {"employeeId": 1} ] ] } ] }"#;
    let parsed = json::parse(&ROSTER_CFG, shuffled).unwrap();
    assert_eq!(
        json::print(&ROSTER_CFG, parsed.as_ref()).unwrap(),
        r#"{"roster":[{"employee":[[{"employeeId":1},{"name":"Ada"}]]}]}"#
    );
}

#[test]
fn copy_is_equal_and_independent() {
    let roster = parse_roster();
    let mut copy = roster.clone();

    assert!(ops::compare(&ROSTER_CFG, roster.as_ref(), &ROSTER_CFG, copy.as_ref()));

    // Mutating the copy leaves the original untouched.
    if let Some(Value::Seq(slots)) = copy.as_mut() {
        if let Some(Value::List(items)) = slots[0].as_mut() {
            items.pop();
        }
    }
    assert!(!ops::compare(&ROSTER_CFG, roster.as_ref(), &ROSTER_CFG, copy.as_ref()));
    assert_eq!(roster_items(roster.as_ref().unwrap()).len(), 2);
}

#[test]
fn compare_collapses_absence() {
    let roster = parse_roster();
    assert!(!ops::compare(&ROSTER_CFG, roster.as_ref(), &ROSTER_CFG, None));
    assert!(ops::compare(&ROSTER_CFG, None, &ROSTER_CFG, None));
}

#[test]
fn is_null_and_is_empty_distinguish_presence() {
    let absent: Option<Value> = None;
    assert!(ops::is_null(&EMPLOYEE_ROOT, absent.as_ref()));
    assert!(!ops::is_empty(&EMPLOYEE_ROOT, absent.as_ref()));

    let empty = json::parse(&EMPLOYEE_ROOT, r#"{"employee":[]}"#).unwrap();
    assert!(!ops::is_null(&EMPLOYEE_ROOT, empty.as_ref()));
    assert!(ops::is_empty(&EMPLOYEE_ROOT, empty.as_ref()));

    let filled = json::parse(&EMPLOYEE_ROOT, r#"{"employee":[{"employeeId":1}]}"#).unwrap();
    assert!(!ops::is_empty(&EMPLOYEE_ROOT, filled.as_ref()));
}

#[test]
fn selectors_match_wildcards_absent_fields() {
    let roster = parse_roster();
    let items = roster_items(roster.as_ref().unwrap());

    let by_id = json::parse(&SELECTORS_ROOT, r#"{"selectors":[{"employeeId":2}]}"#).unwrap();
    assert!(!ops::selectors_match(
        &EMPLOYEE_ITEM_CFG,
        Some(&items[0]),
        &SELECTORS_ROOT,
        by_id.as_ref()
    ));
    assert!(ops::selectors_match(
        &EMPLOYEE_ITEM_CFG,
        Some(&items[1]),
        &SELECTORS_ROOT,
        by_id.as_ref()
    ));

    // An empty selector set matches everything.
    let empty = json::parse(&SELECTORS_ROOT, r#"{"selectors":[]}"#).unwrap();
    assert!(ops::selectors_match(
        &EMPLOYEE_ITEM_CFG,
        Some(&items[0]),
        &SELECTORS_ROOT,
        empty.as_ref()
    ));
}

#[test]
fn identifiers_match_ignores_non_identifier_fields() {
    let roster = parse_roster();
    let items = roster_items(roster.as_ref().unwrap());

    // Same id, different name: still an identifier match.
    let probe = json::parse(
        &EMPLOYEE_ROOT,
        r#"{"employee":[{"employeeId":1},{"name":"Someone Else"}]}"#,
    )
    .unwrap();
    assert!(ops::identifiers_match(
        &EMPLOYEE_ITEM_CFG,
        Some(&items[0]),
        probe.as_ref()
    ));
    assert!(!ops::identifiers_match(
        &EMPLOYEE_ITEM_CFG,
        Some(&items[1]),
        probe.as_ref()
    ));

    // A source without identifiers matches anything.
    let anonymous = json::parse(&EMPLOYEE_ROOT, r#"{"employee":[{"name":"Ada"}]}"#).unwrap();
    assert!(ops::identifiers_match(
        &EMPLOYEE_ITEM_CFG,
        Some(&items[1]),
        anonymous.as_ref()
    ));

    // Reflexivity.
    assert!(ops::identifiers_match(
        &EMPLOYEE_ITEM_CFG,
        Some(&items[0]),
        Some(&items[0])
    ));
}

#[test]
fn read_elements_copies_masked_fields_only() {
    let roster = parse_roster();
    let source = &roster_items(roster.as_ref().unwrap())[0];

    // Mask: name plus address.city.
    let mask = json::parse(
        &ELEMENTS_ROOT,
        r#"{"elements":[{"name":[]},{"address":[{"city":[]}]}]}"#,
    )
    .unwrap();

    let mut narrowed = None;
    ops::read_elements(
        &EMPLOYEE_ITEM_CFG,
        Some(source),
        &mut narrowed,
        &ELEMENTS_ROOT,
        mask.as_ref(),
    )
    .unwrap();

    let narrowed = narrowed.unwrap();
    assert!(employee_field(&narrowed, 0).is_none()); // employeeId masked out
    assert_eq!(
        employee_field(&narrowed, 1).and_then(Value::as_str),
        Some("Ada")
    );
    let address = employee_field(&narrowed, 3).unwrap();
    assert!(address.seq_child(0).is_none()); // street masked out
    assert_eq!(
        address.seq_child(1).and_then(Value::as_str),
        Some("London")
    );

    // An empty address sub-mask copies the address wholesale.
    let wholesale = json::parse(&ELEMENTS_ROOT, r#"{"elements":[{"address":[]}]}"#).unwrap();
    let mut narrowed = None;
    ops::read_elements(
        &EMPLOYEE_ITEM_CFG,
        Some(source),
        &mut narrowed,
        &ELEMENTS_ROOT,
        wholesale.as_ref(),
    )
    .unwrap();
    let address = employee_field(&narrowed.unwrap(), 3).unwrap().clone();
    assert_eq!(address.seq_child(0).and_then(Value::as_str), Some("1 Loop Road"));
}

#[test]
fn write_elements_preserves_unset_fields() {
    let roster = parse_roster();
    let mut target = Some(roster_items(roster.as_ref().unwrap())[0].clone());

    let update = json::parse(
        &EMPLOYEE_ROOT,
        r#"{"employee":[{"grade":"junior"}]}"#,
    )
    .unwrap();

    ops::write_elements(&EMPLOYEE_ITEM_CFG, &mut target, update.as_ref()).unwrap();

    let target = target.unwrap();
    assert_eq!(employee_field(&target, 1).and_then(Value::as_str), Some("Ada"));
    assert_eq!(employee_field(&target, 2).and_then(Value::as_enum), Some(0));
}

#[test]
fn write_partial_selector_case_updates_matching_items() {
    let mut roster = parse_roster();

    let update = json::parse(
        &ROSTER_CFG,
        r#"{"roster":[{"employee":[[{"grade":"junior"}]]}]}"#,
    )
    .unwrap();
    let selectors = json::parse(&SELECTORS_ROOT, r#"{"selectors":[{"employeeId":2}]}"#).unwrap();

    ops::write_partial(
        &ROSTER_CFG,
        &mut roster,
        update.as_ref(),
        &SELECTORS_ROOT,
        selectors.as_ref(),
    )
    .unwrap();

    let items = roster_items(roster.as_ref().unwrap());
    assert_eq!(employee_field(&items[0], 2).and_then(Value::as_enum), Some(2));
    assert_eq!(employee_field(&items[1], 2).and_then(Value::as_enum), Some(0));
}

#[test]
fn write_partial_broadcast_case_updates_every_item() {
    // Broadcast applies to schemas whose items declare no identifiers
    // (identifier-bearing schemas go through the merge case instead).
    static NOTE_CFG: [DataCfg; 2] = [
        DataCfg::new("text", DataKind::String),
        DataCfg::new("pinned", DataKind::Bool),
    ];
    static NOTE_ITEM_CFG: DataCfg = DataCfg::new("", DataKind::Sequence(&NOTE_CFG));
    static NOTE_LIST_CFG: DataCfg = DataCfg::new("note", DataKind::List(&NOTE_ITEM_CFG));
    static BOARD_CFG: DataCfg = DataCfg::new("board", DataKind::Container(&NOTE_LIST_CFG));

    let mut board = json::parse(
        &BOARD_CFG,
        r#"{"board":[{"note":[[{"text":"a"},{"pinned":false}],[{"text":"b"},{"pinned":false}]]}]}"#,
    )
    .unwrap();

    let update = json::parse(&BOARD_CFG, r#"{"board":[{"note":[[{"pinned":true}]]}]}"#).unwrap();
    static STUB: DataCfg = DataCfg::new("", DataKind::Stub);

    ops::write_partial(&BOARD_CFG, &mut board, update.as_ref(), &STUB, None).unwrap();

    let items = board
        .as_ref()
        .and_then(Value::as_seq)
        .and_then(|slots| slots[0].as_ref())
        .and_then(Value::as_list)
        .unwrap();
    for (item, text) in items.iter().zip(["a", "b"]) {
        assert_eq!(item.seq_child(0).and_then(Value::as_str), Some(text));
        assert_eq!(item.seq_child(1).and_then(Value::as_bool), Some(true));
    }
}

#[test]
fn write_partial_merge_case_overwrites_and_appends() {
    let mut roster = parse_roster();

    // Source items carry identifiers: id 2 is updated, id 3 appended.
    let update = json::parse(
        &ROSTER_CFG,
        concat!(
            r#"{"roster":[{"employee":["#,
            r#"[{"employeeId":2},{"name":"Brian K."}],"#,
            r#"[{"employeeId":3},{"name":"Carol"},{"grade":"junior"}]"#,
            r#"]}]}"#
        ),
    )
    .unwrap();
    static STUB: DataCfg = DataCfg::new("", DataKind::Stub);

    ops::write_partial(&ROSTER_CFG, &mut roster, update.as_ref(), &STUB, None).unwrap();

    let items = roster_items(roster.as_ref().unwrap());
    assert_eq!(items.len(), 3);
    assert_eq!(
        employee_field(&items[1], 1).and_then(Value::as_str),
        Some("Brian K.")
    );
    // Untouched fields of the merged item survive.
    assert_eq!(employee_field(&items[1], 2).and_then(Value::as_enum), Some(1));
    assert_eq!(
        employee_field(&items[2], 1).and_then(Value::as_str),
        Some("Carol")
    );
}

#[test]
fn delete_partial_drops_selected_items() {
    let mut roster = parse_roster();

    let selectors = json::parse(&SELECTORS_ROOT, r#"{"selectors":[{"employeeId":1}]}"#).unwrap();
    static STUB: DataCfg = DataCfg::new("", DataKind::Stub);

    ops::delete_partial(
        &ROSTER_CFG,
        &mut roster,
        &SELECTORS_ROOT,
        selectors.as_ref(),
        &STUB,
        None,
    );

    let items = roster_items(roster.as_ref().unwrap());
    assert_eq!(items.len(), 1);
    assert_eq!(employee_field(&items[0], 0).and_then(Value::as_unsigned), Some(2));
}

#[test]
fn delete_partial_with_elements_strips_fields() {
    let mut roster = parse_roster();

    let mask = json::parse(&ELEMENTS_ROOT, r#"{"elements":[{"hired":[]}]}"#).unwrap();
    static STUB: DataCfg = DataCfg::new("", DataKind::Stub);

    // No selectors: the mask applies to every item.
    ops::delete_partial(&ROSTER_CFG, &mut roster, &STUB, None, &ELEMENTS_ROOT, mask.as_ref());

    for item in roster_items(roster.as_ref().unwrap()) {
        assert!(employee_field(item, 4).is_none());
        assert!(employee_field(item, 1).is_some());
    }

    // Neither selectors nor elements: a no-op.
    let before = roster.clone();
    ops::delete_partial(&ROSTER_CFG, &mut roster, &STUB, None, &STUB, None);
    assert!(ops::compare(&ROSTER_CFG, roster.as_ref(), &ROSTER_CFG, before.as_ref()));
}

#[test]
fn copy_matching_filters_by_selectors() {
    let roster = parse_roster();

    let to_match = json::parse(&EMPLOYEE_ROOT, r#"{"employee":[{"grade":"senior"}]}"#).unwrap();

    let mut matched = None;
    ops::copy_matching(&ROSTER_CFG, roster.as_ref(), &mut matched, to_match.as_ref()).unwrap();

    let items = roster_items(matched.as_ref().unwrap());
    assert_eq!(items.len(), 1);
    assert_eq!(employee_field(&items[0], 0).and_then(Value::as_unsigned), Some(2));
}

#[test]
fn seq_accessors_follow_schema_names() {
    let employee = json::parse(
        &EMPLOYEE_ROOT,
        r#"{"employee":[{"employeeId":7},{"name":"Grace"}]}"#,
    )
    .unwrap();

    assert_eq!(
        data::seq_get(&EMPLOYEE_ROOT, employee.as_ref(), "name").and_then(Value::as_str),
        Some("Grace")
    );
    assert!(data::seq_get(&EMPLOYEE_ROOT, employee.as_ref(), "grade").is_none());
}

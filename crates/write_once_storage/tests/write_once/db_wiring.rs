#![forbid(unsafe_code)]

use std::sync::Arc;

use write_once_contracts::{FieldName, FieldValue, RecordTypeId};
use write_once_engine::{EnforcementPolicy, GuardDecision, PolicyHandle, RecordingWarningSink};
use write_once_storage::{
    BelongsTo, Record, RecordSchema, RecordStore, StorageError, WriteOnceRecordRepo,
};

fn f(name: &str) -> FieldName {
    FieldName::new(name).unwrap()
}

fn users() -> RecordTypeId {
    RecordTypeId::new("users").unwrap()
}

fn accounts() -> RecordTypeId {
    RecordTypeId::new("accounts").unwrap()
}

fn schemas() -> Vec<RecordSchema> {
    vec![
        RecordSchema::v1(
            users(),
            vec![f("account_id"), f("experiment_group"), f("uid")],
            vec![f("experiment_group"), f("account_id"), f("uid")],
            vec![BelongsTo::v1(f("account"), f("account_id"), accounts())],
        )
        .unwrap(),
        RecordSchema::v1(accounts(), vec![], vec![], vec![]).unwrap(),
    ]
}

fn strict_store() -> RecordStore {
    RecordStore::new_in_memory(schemas(), PolicyHandle::new(EnforcementPolicy::strict())).unwrap()
}

fn permissive_store() -> (RecordStore, Arc<RecordingWarningSink>) {
    let sink = Arc::new(RecordingWarningSink::new());
    let s = RecordStore::new_in_memory(
        schemas(),
        PolicyHandle::new(EnforcementPolicy::strict().with_warning_sink(sink.clone())),
    )
    .unwrap();
    s.policy().configure(|p| p.set_strict(false));
    (s, sink)
}

/// Unsaved user in group "alpha" pointing at a freshly created account.
fn subject(s: &mut RecordStore) -> (Record, Record) {
    let account = s.create_record(&accounts(), vec![]).unwrap();
    let account_id = FieldValue::try_from(account.id().unwrap()).unwrap();
    let user = s
        .build_record(
            &users(),
            vec![
                (f("experiment_group"), "alpha".into()),
                (f("account_id"), account_id),
            ],
        )
        .unwrap();
    (user, account)
}

fn persisted_subject(s: &mut RecordStore) -> (Record, Record) {
    let (mut user, account) = subject(s);
    s.save_record(&mut user).unwrap();
    (user, account)
}

#[test]
fn at_wo_db_01_lists_write_once_attributes() {
    let s = strict_store();
    let listed: Vec<String> = s
        .write_once_fields("users")
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(listed, vec!["experiment_group", "account_id", "uid"]);
    assert!(s.write_once_fields("accounts").is_empty());
    assert!(s.write_once_attribute("users", "uid"));
    assert!(!s.write_once_attribute("accounts", "uid"));
}

#[test]
fn at_wo_db_02_nullable_value_overwritten_in_memory() {
    let mut s = strict_store();
    let (mut user, _) = subject(&mut s);
    assert_eq!(user.value("uid"), FieldValue::Null);
    s.assign_field(&mut user, &f("uid"), "example".into()).unwrap();
    assert_eq!(user.value("uid"), FieldValue::from("example"));
}

#[test]
fn at_wo_db_03_nullable_value_overwritten_as_update() {
    let mut s = strict_store();
    let (mut user, _) = subject(&mut s);
    s.update_record(&mut user, vec![(f("uid"), "example".into())])
        .unwrap();
    assert_eq!(user.value("uid"), FieldValue::from("example"));
    assert!(user.is_persisted());
}

#[test]
fn at_wo_db_04_non_null_value_overwritten_in_memory_before_save() {
    let mut s = strict_store();
    let (mut user, _) = subject(&mut s);
    assert_eq!(user.value("experiment_group"), FieldValue::from("alpha"));
    s.assign_field(&mut user, &f("experiment_group"), "beta".into())
        .unwrap();
    assert_eq!(user.value("experiment_group"), FieldValue::from("beta"));
}

#[test]
fn at_wo_db_05_non_null_value_overwritten_via_update_before_save() {
    let mut s = strict_store();
    let (mut user, _) = subject(&mut s);
    s.update_record(&mut user, vec![(f("experiment_group"), "beta".into())])
        .unwrap();
    assert_eq!(user.value("experiment_group"), FieldValue::from("beta"));
    let stored = s.find_record(&users(), user.id().unwrap()).unwrap();
    assert_eq!(stored.value("experiment_group"), FieldValue::from("beta"));
}

#[test]
fn at_wo_db_06_persisted_value_not_overwritten_in_memory() {
    let mut s = strict_store();
    let (mut user, _) = persisted_subject(&mut s);
    let err = s
        .assign_field(&mut user, &f("experiment_group"), "beta".into())
        .unwrap_err();
    assert!(matches!(err, StorageError::WriteOnce(ref v) if v.field.as_str() == "experiment_group"));
    assert_eq!(user.value("experiment_group"), FieldValue::from("alpha"));
}

#[test]
fn at_wo_db_07_persisted_value_not_overwritten_via_update() {
    let mut s = strict_store();
    let (mut user, _) = persisted_subject(&mut s);
    let err = s
        .update_record(&mut user, vec![(f("experiment_group"), "beta".into())])
        .unwrap_err();
    assert!(matches!(err, StorageError::WriteOnce(_)));
    assert_eq!(user.value("experiment_group"), FieldValue::from("alpha"));
    let stored = s.find_record(&users(), user.id().unwrap()).unwrap();
    assert_eq!(stored.value("experiment_group"), FieldValue::from("alpha"));
}

#[test]
fn at_wo_db_08_persisted_association_not_reassigned() {
    let mut s = strict_store();
    let (mut user, account) = persisted_subject(&mut s);
    let other = s.create_record(&accounts(), vec![]).unwrap();

    let err = s.associate_record(&mut user, "account", &other).unwrap_err();
    let StorageError::WriteOnce(v) = err else {
        panic!("expected write-once violation");
    };
    assert_eq!(v.field.as_str(), "account_id");

    let linked = s.associated(&user, "account").unwrap().unwrap();
    assert_eq!(linked.id(), account.id());
}

#[test]
fn at_wo_db_09_permissive_warns_in_memory() {
    let (mut s, sink) = permissive_store();
    let (mut user, _) = persisted_subject(&mut s);
    let decision = s
        .assign_field(&mut user, &f("experiment_group"), "beta".into())
        .unwrap();
    assert_eq!(decision, GuardDecision::Warned);
    assert_eq!(user.value("experiment_group"), FieldValue::from("beta"));
    assert_eq!(sink.len(), 1);
}

#[test]
fn at_wo_db_10_permissive_warns_via_update() {
    let (mut s, sink) = permissive_store();
    let (mut user, _) = persisted_subject(&mut s);
    s.update_record(&mut user, vec![(f("experiment_group"), "beta".into())])
        .unwrap();
    assert_eq!(user.value("experiment_group"), FieldValue::from("beta"));
    let stored = s.find_record(&users(), user.id().unwrap()).unwrap();
    assert_eq!(stored.value("experiment_group"), FieldValue::from("beta"));
    let warnings = sink.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field.as_str(), "experiment_group");
}

#[test]
fn at_wo_db_11_permissive_warns_on_association_update() {
    let (mut s, sink) = permissive_store();
    let (mut user, _) = persisted_subject(&mut s);
    let other = s.create_record(&accounts(), vec![]).unwrap();

    let decision = s.associate_record(&mut user, "account", &other).unwrap();
    s.save_record(&mut user).unwrap();

    assert_eq!(decision, GuardDecision::Warned);
    assert_eq!(sink.len(), 1);
    let linked = s.associated(&user, "account").unwrap().unwrap();
    assert_eq!(linked.id(), other.id());
}

#[test]
fn at_wo_db_12_policy_switch_between_strict_and_permissive() {
    let sink = Arc::new(RecordingWarningSink::new());
    let kind = RecordTypeId::new("tickets").unwrap();
    let mut s = RecordStore::new_in_memory(
        vec![RecordSchema::v1(
            kind.clone(),
            vec![f("status"), f("owner_id"), f("note")],
            vec![f("status"), f("owner_id")],
            vec![],
        )
        .unwrap()],
        PolicyHandle::new(EnforcementPolicy::strict().with_warning_sink(sink.clone())),
    )
    .unwrap();
    let mut ticket = s
        .create_record(
            &kind,
            vec![(f("status"), "alpha".into()), (f("owner_id"), 7_i64.into())],
        )
        .unwrap();

    let err = s
        .assign_field(&mut ticket, &f("status"), "beta".into())
        .unwrap_err();
    assert!(matches!(err, StorageError::WriteOnce(_)));
    assert_eq!(ticket.value("status"), FieldValue::from("alpha"));
    assert!(sink.is_empty());

    s.policy().configure(|p| p.set_strict(false));
    s.assign_field(&mut ticket, &f("status"), "beta".into())
        .unwrap();
    assert_eq!(ticket.value("status"), FieldValue::from("beta"));
    let warnings = sink.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field.as_str(), "status");
    assert_eq!(warnings[0].old_value, FieldValue::from("alpha"));
    assert_eq!(warnings[0].new_value, FieldValue::from("beta"));

    // Unprotected fields never warn or block.
    s.assign_field(&mut ticket, &f("note"), "a".into()).unwrap();
    s.assign_field(&mut ticket, &f("note"), "b".into()).unwrap();
    assert_eq!(sink.len(), 1);
}

#[test]
fn at_wo_db_13_first_set_after_persist_then_locked() {
    let mut s = strict_store();
    let (mut user, _) = persisted_subject(&mut s);
    s.update_record(&mut user, vec![(f("uid"), "example".into())])
        .unwrap();
    s.update_record(&mut user, vec![(f("uid"), "example".into())])
        .unwrap();
    let err = s
        .update_record(&mut user, vec![(f("uid"), "other".into())])
        .unwrap_err();
    assert!(matches!(err, StorageError::WriteOnce(_)));
    assert_eq!(user.value("uid"), FieldValue::from("example"));
}

#[test]
fn at_wo_db_14_reloaded_record_is_guarded() {
    let mut s = strict_store();
    let (user, _) = persisted_subject(&mut s);
    let mut reloaded = s.find_record(&users(), user.id().unwrap()).unwrap();
    assert!(reloaded.is_persisted());
    assert!(s
        .assign_field(&mut reloaded, &f("experiment_group"), "beta".into())
        .is_err());
    assert_eq!(
        s.assign_field(&mut reloaded, &f("experiment_group"), "alpha".into()),
        Ok(GuardDecision::Allowed)
    );
}

mod common;

use chrono::Utc;
use common::Backend;
use resmap::statement::FieldValues;
use resmap::{
    Conditions, DbError, Resource, ResourceBase, ResourceMeta, ResourceStore, SqlStore, Transaction,
    Value,
};
use std::sync::Arc;

resmap::resource! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Zone as "zone" {
        pub name: String => [Unique],
    }
}

resmap::resource! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Record as "record" {
        pub name: String,
        pub ttl: u32 => [Positive],
        pub zone: String => [Owner],
    }
}

resmap::resource! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Role as "role" {
        pub name: String,
    }
}

resmap::resource! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct ZoneRole as "zone_role" {
        pub zone: String => [Owner, UniqueKey],
        pub role: String => [Refer, UniqueKey],
        pub level: u8,
    }
}

resmap::resource! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Orphan as "orphan" {
        pub name: String,
    }
}

fn meta() -> Arc<ResourceMeta> {
    Arc::new(resmap::registry!(Zone, Record, Role, ZoneRole).unwrap())
}

async fn open(backend: &Backend) -> SqlStore<common::ScriptedFactory> {
    SqlStore::with_factory(backend.factory(), meta()).await.unwrap()
}

fn record(name: &str, zone: &str) -> Record {
    Record {
        base: ResourceBase::default(),
        name: name.to_string(),
        ttl: 300,
        zone: zone.to_string(),
    }
}

#[tokio::test]
async fn test_open_creates_tables_in_registration_order() {
    let backend = Backend::new();
    let _store = open(&backend).await;

    let statements = backend.statements();
    assert_eq!(statements.len(), 4);
    assert!(statements[0].starts_with("create table if not exists res_zone "));
    assert!(statements[1].starts_with("create table if not exists res_record "));
    assert!(statements[1].contains("references res_zone (\"id\") on delete cascade"));
    assert!(statements[3].contains("references res_role (\"id\") on delete restrict"));
    assert!(statements[3].contains("unique (\"zone\", \"role\")"));
}

#[tokio::test]
async fn test_insert_assigns_identifier() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.clear();

    let mut tx = store.begin().await.unwrap();
    let stored = tx.insert(record("www", "z1")).await.unwrap();
    tx.commit().await.unwrap();

    assert!(!stored.id().is_empty());
    assert!(stored.base.create_time.is_some());

    let dml = backend.dml();
    assert_eq!(dml.len(), 1);
    assert!(dml[0].sql.starts_with("insert into res_record"));
    assert_eq!(dml[0].args[0], Value::Text(stored.id().to_string()));
    assert_eq!(dml[0].args[2], Value::from("www"));
    assert_eq!(
        backend.statements(),
        vec!["begin".to_string(), dml[0].sql.clone(), "commit".to_string()]
    );
}

#[tokio::test]
async fn test_insert_keeps_preset_identifier() {
    let backend = Backend::new();
    let store = open(&backend).await;

    let mut r = record("mx", "z1");
    r.base = ResourceBase::with_id("rec-7");

    let mut tx = store.begin().await.unwrap();
    let stored = tx.insert(r).await.unwrap();
    assert_eq!(stored.id(), "rec-7");
}

#[tokio::test]
async fn test_get_maps_rows_onto_resources() {
    let backend = Backend::new();
    let store = open(&backend).await;
    let now = Utc::now();
    backend.rows(
        &["id", "create_time", "name", "ttl", "zone"],
        vec![
            vec![
                Value::from("r1"),
                Value::Timestamp(now),
                Value::from("www"),
                Value::Integer(300),
                Value::from("z1"),
            ],
            vec![
                Value::from("r2"),
                Value::Timestamp(now),
                Value::from("mail"),
                Value::Integer(60),
                Value::from("z1"),
            ],
        ],
    );

    let mut tx = store.begin().await.unwrap();
    let records: Vec<Record> = tx.get(&Conditions::new().eq("zone", "z1")).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id(), "r1");
    assert_eq!(records[0].base.create_time, Some(now));
    assert_eq!(records[1].name, "mail");
    assert_eq!(records[1].ttl, 60);

    let dml = backend.dml();
    assert_eq!(dml[0].sql, "select * from res_record where \"zone\" = $1 order by \"id\"");
    assert_eq!(dml[0].args, vec![Value::from("z1")]);
}

#[tokio::test]
async fn test_fill_replaces_output() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.rows(&["id", "name"], vec![vec![Value::from("z9"), Value::from("example.org")]]);

    let mut tx = store.begin().await.unwrap();
    let mut zones = vec![Zone {
        base: ResourceBase::with_id("stale"),
        name: "old".to_string(),
    }];
    tx.fill(&Conditions::new(), &mut zones).await.unwrap();

    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].id(), "z9");
    assert_eq!(backend.dml()[0].sql, "select * from res_zone order by \"id\"");
}

#[tokio::test]
async fn test_unique_violation_becomes_duplicate_resource() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.fail(DbError::UniqueViolation("name".to_string()));

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .insert(Zone {
            base: ResourceBase::default(),
            name: "example.org".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::DuplicateResource { ref resource, .. } if resource == "zone"));
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn test_foreign_key_violation_becomes_related_missing() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.fail(DbError::ForeignKeyViolation("zone".to_string()));

    let mut tx = store.begin().await.unwrap();
    let err = tx.insert(record("www", "missing")).await.unwrap_err();
    assert!(matches!(err, DbError::RelatedResourceMissing { ref resource, .. } if resource == "record"));

    backend.fail(DbError::ForeignKeyViolation("role".to_string()));
    let err = tx.delete::<Role>(&Conditions::new().id("r1")).await.unwrap_err();
    assert!(err.is_constraint());
}

#[tokio::test]
async fn test_other_errors_pass_through() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.fail(DbError::ExecutionError("disk full".to_string()));

    let mut tx = store.begin().await.unwrap();
    let err = tx.insert(record("www", "z1")).await.unwrap_err();
    assert!(matches!(err, DbError::ExecutionError(_)));
}

#[tokio::test]
async fn test_statement_errors_happen_before_io() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.clear();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .get::<Record>(&Conditions::new().eq("color", "red"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownColumn { .. }));

    let err = tx.count::<Orphan>(&Conditions::new()).await.unwrap_err();
    assert!(matches!(err, DbError::UnknownResource(_)));

    let err = tx
        .get_ex::<Orphan>("select * from res_orphan", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownResource(_)));

    assert!(backend.dml().is_empty());
}

#[tokio::test]
async fn test_search_on_numeric_column_fails_before_io() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.clear();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .get::<Record>(&Conditions::new().search("ttl", "30"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidCondition(_)));

    let err = tx
        .count::<Record>(&Conditions::new().search("ttl", "30"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidCondition(_)));

    assert!(backend.dml().is_empty());
}

#[tokio::test]
async fn test_count_and_exists() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.scalar(Value::Integer(3));
    backend.scalar(Value::Boolean(true));

    let mut tx = store.begin().await.unwrap();
    let conds = Conditions::new().eq("zone", "z1");
    assert_eq!(tx.count::<Record>(&conds).await.unwrap(), 3);
    assert!(tx.exists::<Record>(&conds).await.unwrap());

    let dml = backend.dml();
    assert_eq!(dml[0].sql, "select count(*) from res_record where \"zone\" = $1");
    assert_eq!(
        dml[1].sql,
        "select exists (select 1 from res_record where \"zone\" = $1)"
    );
}

#[tokio::test]
async fn test_count_ex_runs_caller_statement() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.scalar(Value::Integer(7));

    let mut tx = store.begin().await.unwrap();
    let n = tx
        .count_ex::<Record>(
            "select count(*) from res_record where \"ttl\" > $1",
            &[Value::Integer(100)],
        )
        .await
        .unwrap();

    assert_eq!(n, 7);
    assert_eq!(backend.dml()[0].args, vec![Value::Integer(100)]);
}

#[tokio::test]
async fn test_get_owned_joins_relationship() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.rows(&["id", "name"], vec![vec![Value::from("ro1"), Value::from("admin")]]);

    let mut tx = store.begin().await.unwrap();
    let roles: Vec<Role> = tx
        .get_owned::<Zone, Role>("z1", &Conditions::new())
        .await
        .unwrap();

    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].name, "admin");
    let dml = backend.dml();
    assert_eq!(
        dml[0].sql,
        "select res_role.* from res_role inner join res_zone_role \
         on (res_role.\"id\" = res_zone_role.\"role\") \
         where res_zone_role.\"zone\" = $1 order by res_role.\"id\""
    );

    let err = tx
        .get_owned::<Role, Zone>("ro1", &Conditions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownResource(_)));
}

#[tokio::test]
async fn test_update_and_delete_return_affected_rows() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.affected(2);
    backend.affected(5);

    let mut tx = store.begin().await.unwrap();
    let mut values = FieldValues::new();
    values.insert("ttl".to_string(), Value::Integer(60));

    let updated = tx
        .update::<Record>(&values, &Conditions::new().eq("zone", "z1"))
        .await
        .unwrap();
    let deleted = tx.delete::<Record>(&Conditions::new()).await.unwrap();

    assert_eq!(updated, 2);
    assert_eq!(deleted, 5);
    let dml = backend.dml();
    assert_eq!(dml[0].sql, "update res_record set \"ttl\" = $1 where \"zone\" = $2");
    assert_eq!(dml[1].sql, "delete from res_record");
}

#[tokio::test]
async fn test_each_transaction_gets_a_connection() {
    let backend = Backend::new();
    let store = open(&backend).await;
    assert_eq!(backend.connects(), 1);

    let a = store.begin().await.unwrap();
    let b = store.begin().await.unwrap();
    assert_eq!(backend.connects(), 3);

    a.commit().await.unwrap();
    b.rollback().await.unwrap();
    let statements = backend.statements();
    assert!(statements.contains(&"commit".to_string()));
    assert!(statements.contains(&"rollback".to_string()));
}

#[tokio::test]
async fn test_clean_drops_in_reverse_order() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.clear();

    store.clean().await.unwrap();
    assert_eq!(
        backend.statements(),
        vec![
            "drop table if exists res_zone_role",
            "drop table if exists res_role",
            "drop table if exists res_record",
            "drop table if exists res_zone",
        ]
    );
}

#[tokio::test]
async fn test_begin_after_close_fails() {
    let backend = Backend::new();
    let store = open(&backend).await;

    store.close().await.unwrap();
    assert!(store.is_closed());
    assert!(matches!(store.begin().await, Err(DbError::StoreClosed)));
    assert!(matches!(store.clean().await, Err(DbError::StoreClosed)));
}

#[tokio::test]
async fn test_failed_commit_is_reported() {
    let backend = Backend::new();
    let store = open(&backend).await;
    backend.fail_batch("commit");

    let tx = store.begin().await.unwrap();
    assert!(tx.commit().await.is_err());
}

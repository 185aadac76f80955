//! Target extraction and reconciliation over realistic migration batches

use pretty_assertions::assert_eq;

use rust_sqlscripter::extract::{
    extract_targets, reconcile, resolve_occurrences, RegexTargetExtractor, TargetExtractor,
    TargetOccurrence,
};
use rust_sqlscripter::model::{ObjectAction, ObjectIdentity, ObjectType};
use rust_sqlscripter::SqlScript;

fn targets(scripts: &[SqlScript]) -> Vec<ObjectIdentity> {
    let occurrences = extract_targets(&RegexTargetExtractor::new(), scripts);
    reconcile(resolve_occurrences(occurrences, |_, _| ObjectType::Table))
}

fn summary(identities: &[ObjectIdentity]) -> Vec<String> {
    identities
        .iter()
        .map(|i| format!("{:?} {} {}", i.action, i.object_type, i.full_name()))
        .collect()
}

#[test]
fn test_batch_keeps_last_action_per_object() {
    let scripts = vec![
        SqlScript::new(
            "0001.sql",
            r#"
CREATE TABLE [dbo].[Orders] (
    [Id] INT NOT NULL PRIMARY KEY
);
GO
CREATE VIEW dbo.OpenOrders AS SELECT Id FROM dbo.Orders;
GO
"#,
        ),
        SqlScript::new(
            "0002.sql",
            r#"
DROP VIEW IF EXISTS dbo.OpenOrders;
GO
CREATE OR ALTER PROCEDURE Sales.GetOrders AS SELECT * FROM dbo.Orders;
GO
"#,
        ),
    ];

    assert_eq!(
        summary(&targets(&scripts)),
        vec![
            "Create Table dbo.Orders",
            "Drop View dbo.OpenOrders",
            "Create Procedure Sales.GetOrders",
        ]
    );
}

#[test]
fn test_dedup_is_case_insensitive() {
    let scripts = vec![
        SqlScript::new("0001.sql", "CREATE TABLE dbo.Orders (Id INT)"),
        SqlScript::new("0002.sql", "drop table DBO.ORDERS"),
    ];

    let result = targets(&scripts);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].action, ObjectAction::Drop);
    assert_eq!(result[0].full_name(), "DBO.ORDERS");
}

#[test]
fn test_rename_pair_shares_resolved_type() {
    let scripts = vec![SqlScript::new(
        "0003.sql",
        "EXEC sp_rename @objname = N'dbo.usp_Old', @newname = N'usp_New'",
    )];
    let occurrences = extract_targets(&RegexTargetExtractor::new(), &scripts);
    let mut probed = Vec::new();
    let identities = resolve_occurrences(occurrences, |schema, name| {
        probed.push(format!("{}.{}", schema, name));
        ObjectType::Procedure
    });

    assert_eq!(probed, vec!["dbo.usp_New"]);
    assert_eq!(
        summary(&identities),
        vec!["Drop Procedure dbo.usp_Old", "Create Procedure dbo.usp_New"]
    );
}

#[test]
fn test_unqualified_rename_defaults_schema() {
    let occurrences: Vec<_> = RegexTargetExtractor::new()
        .extract("EXEC sp_rename 'Customers', 'Clients'")
        .collect();

    match &occurrences[..] {
        [TargetOccurrence::Rename { old, new }] => {
            assert_eq!(old.full_name(), "dbo.Customers");
            assert_eq!(new.full_name(), "dbo.Clients");
        }
        other => panic!("unexpected occurrences: {:?}", other),
    }
}

#[test]
fn test_statement_order_within_script_includes_renames() {
    let script = "CREATE TABLE dbo.A (Id INT)\nEXEC sp_rename 'dbo.A', 'B'\nCREATE VIEW dbo.V AS SELECT 1 AS X";
    let occurrences: Vec<_> = RegexTargetExtractor::new().extract(script).collect();

    assert_eq!(occurrences.len(), 3);
    assert!(matches!(occurrences[0], TargetOccurrence::Statement(_)));
    assert!(matches!(occurrences[1], TargetOccurrence::Rename { .. }));
    assert!(matches!(occurrences[2], TargetOccurrence::Statement(_)));
}

#[test]
fn test_many_scripts_keep_input_order() {
    let scripts: Vec<SqlScript> = (0..20)
        .map(|i| SqlScript::new(format!("{:04}.sql", i), format!("CREATE TABLE dbo.T{} (Id INT)", i)))
        .collect();

    let names: Vec<String> = targets(&scripts).into_iter().map(|i| i.name).collect();
    let expected: Vec<String> = (0..20).map(|i| format!("T{}", i)).collect();
    assert_eq!(names, expected);
}

#[test]
fn test_temp_tables_are_ignored() {
    let scripts = vec![SqlScript::new(
        "0004.sql",
        "CREATE TABLE #work (Id INT)\nDROP TABLE #work",
    )];
    assert!(targets(&scripts).is_empty());
}

//! Export pipeline tests against an in-memory catalog session.
//!
//! The fake session models a server holding several databases. Each
//! function can return source text, refuse it (locked) or fail outright.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use dbexport_core::adapters::{CatalogSession, ConnectionConfig, ServerAddress};
use dbexport_core::export::{ExportConfig, ExportOptions, export_database, run};
use dbexport_core::models::{ColumnDescriptor, FailureStage, ObjectDescriptor, ObjectKind};
use dbexport_core::security::Credentials;
use dbexport_core::{DbExportError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum Source {
    Text(Vec<&'static str>),
    Locked,
    Broken,
}

#[derive(Clone, Default)]
struct FakeDatabase {
    functions: Vec<(ObjectDescriptor, Source)>,
    tables: Vec<(ObjectDescriptor, Vec<ColumnDescriptor>)>,
}

impl FakeDatabase {
    fn function(self, name: &str, source: Source) -> Self {
        self.function_in("dbo", name, source)
    }

    fn function_in(mut self, schema: &str, name: &str, source: Source) -> Self {
        self.functions
            .push((ObjectDescriptor::new(schema, name, ObjectKind::Function), source));
        self
    }

    fn table(mut self, name: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.tables
            .push((ObjectDescriptor::new("dbo", name, ObjectKind::Table), columns));
        self
    }
}

struct FakeSession {
    databases: HashMap<String, FakeDatabase>,
    current: Option<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeSession {
    fn new(databases: Vec<(&str, FakeDatabase)>) -> Self {
        Self {
            databases: databases
                .into_iter()
                .map(|(name, db)| (name.to_string(), db))
                .collect(),
            current: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn current(&self) -> Result<&FakeDatabase> {
        self.current
            .as_ref()
            .and_then(|name| self.databases.get(name))
            .ok_or_else(|| DbExportError::catalog("no database selected", "fake session"))
    }
}

#[async_trait]
impl CatalogSession for FakeSession {
    async fn use_database(&mut self, database: &str) -> Result<()> {
        self.log(format!("use {}", database));
        if self.databases.contains_key(database) {
            self.current = Some(database.to_string());
            Ok(())
        } else {
            Err(DbExportError::database_selection(
                database,
                format!("Database '{}' does not exist.", database),
            ))
        }
    }

    async fn list_objects(&mut self, kind: ObjectKind) -> Result<Vec<ObjectDescriptor>> {
        let db = self.current()?;
        Ok(match kind {
            ObjectKind::Function => db.functions.iter().map(|(o, _)| o.clone()).collect(),
            ObjectKind::Table => db.tables.iter().map(|(o, _)| o.clone()).collect(),
        })
    }

    async fn function_source(&mut self, object: &ObjectDescriptor) -> Result<Vec<String>> {
        let db = self.current()?;
        let source = db
            .functions
            .iter()
            .find(|(o, _)| o == object)
            .map(|(_, s)| s.clone())
            .expect("function exists");
        match source {
            Source::Text(fragments) => Ok(fragments.into_iter().map(str::to_string).collect()),
            Source::Locked => Err(DbExportError::object_unreadable(
                object.qualified_name(),
                "The text for object is encrypted.",
            )),
            Source::Broken => Err(DbExportError::catalog(
                "retrieving definition",
                "connection reset by peer",
            )),
        }
    }

    async fn table_columns(&mut self, object: &ObjectDescriptor) -> Result<Vec<ColumnDescriptor>> {
        let db = self.current()?;
        let columns = db
            .tables
            .iter()
            .find(|(o, _)| o == object)
            .map(|(_, c)| c.clone())
            .expect("table exists");
        if columns.is_empty() {
            return Err(DbExportError::object_unreadable(
                object.qualified_name(),
                "no columns are visible to this login",
            ));
        }
        Ok(columns)
    }

    async fn close(&mut self) -> Result<()> {
        self.log("close".to_string());
        Ok(())
    }

    fn safe_description(&self) -> String {
        "in-memory catalog".to_string()
    }
}

fn options(root: &Path) -> ExportOptions {
    ExportOptions::new().with_output_dir(root)
}

fn config(root: &Path, databases: &[&str]) -> ExportConfig {
    ExportConfig::new(
        ConnectionConfig::new(ServerAddress::new("fake")),
        Credentials::new("reader".to_string(), Some("pw".to_string())),
        databases.iter().map(|d| d.to_string()).collect(),
    )
    .with_options(options(root))
}

fn sql_files(folder: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(folder)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".sql"))
        .collect();
    names.sort();
    names
}

fn sales() -> FakeDatabase {
    FakeDatabase::default()
        .function(
            "fn_Total",
            Source::Text(vec!["CREATE FUNCTION dbo.fn_Total()\r\n", "RETURNS int AS BEGIN RETURN 1 END\r\n"]),
        )
        .function("fn_Secret", Source::Locked)
        .function("fn_Tax", Source::Text(vec!["CREATE FUNCTION dbo.fn_Tax() RETURNS int AS BEGIN RETURN 2 END"]))
        .table(
            "Customers",
            vec![
                ColumnDescriptor::new("Id", "int", None, false),
                ColumnDescriptor::new("Name", "nvarchar", Some(100), true),
            ],
        )
}

fn strip_script_date(text: &str) -> String {
    text.lines()
        .map(|line| match line.find("Script Date:") {
            Some(index) => &line[..index],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_empty_database_creates_no_folders() {
    let temp = tempfile::tempdir().unwrap();
    let mut session = FakeSession::new(vec![("Empty", FakeDatabase::default())]);

    let report = export_database(&mut session, "Empty", &options(temp.path())).await;

    assert!(report.is_success());
    assert_eq!(report.exported(), 0);
    assert!(report.kinds.iter().all(|k| k.discovered == 0));
    assert!(!temp.path().join("Empty_Functions").exists());
    assert!(!temp.path().join("Empty_Tables").exists());
    assert!(!temp.path().join("Reference").exists());
}

#[tokio::test]
async fn test_locked_function_scenario() {
    let temp = tempfile::tempdir().unwrap();
    let mut session = FakeSession::new(vec![("Sales", sales())]);
    let options = options(temp.path()).with_object_kinds([ObjectKind::Function]);

    let report = export_database(&mut session, "Sales", &options).await;

    assert!(report.is_success(), "locked objects must not fail the pass");
    assert_eq!(report.locked_objects, vec!["fn_Secret"]);

    let functions = temp.path().join("Sales_Functions");
    assert_eq!(sql_files(&functions), vec!["fn_Tax.sql", "fn_Total.sql"]);

    let reference = temp.path().join("Reference");
    let reports: Vec<PathBuf> = std::fs::read_dir(&reference)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(reports, vec![reference.join("Sales_Locked_Objects.csv")]);
    assert_eq!(report.locked_report.as_deref(), Some(reports[0].as_path()));

    let csv = std::fs::read_to_string(&reports[0]).unwrap();
    assert_eq!(csv, "Database,Object Name\nSales,fn_Secret\n");
}

#[tokio::test]
async fn test_exported_file_is_header_then_body() {
    let temp = tempfile::tempdir().unwrap();
    let mut session = FakeSession::new(vec![("Sales", sales())]);

    let report = export_database(&mut session, "Sales", &options(temp.path())).await;
    assert!(report.is_success());
    assert_eq!(report.exported(), 3);

    let function = std::fs::read_to_string(temp.path().join("Sales_Functions/fn_Total.sql")).unwrap();
    assert!(function.starts_with("\nUSE [Sales]\nGO\n\n/****** Object:  Function [dbo].[fn_Total]    Script Date: "));
    assert!(function.ends_with(
        " ******/\nSET ANSI_NULLS ON\nGO\nSET QUOTED_IDENTIFIER ON\nGO\nCREATE FUNCTION dbo.fn_Total()\r\nRETURNS int AS BEGIN RETURN 1 END\r\n"
    ));

    let table = std::fs::read_to_string(temp.path().join("Sales_Tables/Customers.sql")).unwrap();
    assert!(table.contains("/****** Object:  Table [dbo].[Customers]"));
    assert!(table.ends_with(
        "SET QUOTED_IDENTIFIER ON\nGO\nCREATE TABLE [dbo].[Customers] (\n    [Id] int NOT NULL,\n    [Name] nvarchar(100) NULL\n);\n"
    ));
}

#[tokio::test]
async fn test_unsafe_names_are_sanitized_on_disk() {
    let temp = tempfile::tempdir().unwrap();
    let db = FakeDatabase::default().function("fn<a>:b", Source::Text(vec!["CREATE FUNCTION x"]));
    let mut session = FakeSession::new(vec![("Sales", db)]);

    let report = export_database(&mut session, "Sales", &options(temp.path())).await;

    assert!(report.is_success());
    assert_eq!(sql_files(&temp.path().join("Sales_Functions")), vec!["fn_a__b.sql"]);
}

#[tokio::test]
async fn test_same_name_in_two_schemas_keeps_both() {
    let temp = tempfile::tempdir().unwrap();
    let db = FakeDatabase::default()
        .function("fn_Calc", Source::Text(vec!["CREATE FUNCTION dbo.fn_Calc() RETURNS int AS BEGIN RETURN 1 END"]))
        .function_in(
            "archive",
            "fn_Calc",
            Source::Text(vec!["CREATE FUNCTION archive.fn_Calc() RETURNS int AS BEGIN RETURN 2 END"]),
        )
        .function("fn_Lock", Source::Locked)
        .function_in("hr", "fn_Lock", Source::Locked);
    let mut session = FakeSession::new(vec![("Sales", db)]);
    let options = options(temp.path()).with_object_kinds([ObjectKind::Function]);

    let report = export_database(&mut session, "Sales", &options).await;

    assert!(report.is_success());
    assert_eq!(report.kinds[0].exported, 2);
    assert_eq!(report.kinds[0].locked, 2);

    let functions = temp.path().join("Sales_Functions");
    assert_eq!(sql_files(&functions), vec!["archive.fn_Calc.sql", "fn_Calc.sql"]);
    let dbo = std::fs::read_to_string(functions.join("fn_Calc.sql")).unwrap();
    let archive = std::fs::read_to_string(functions.join("archive.fn_Calc.sql")).unwrap();
    assert!(dbo.ends_with("CREATE FUNCTION dbo.fn_Calc() RETURNS int AS BEGIN RETURN 1 END"));
    assert!(archive.contains("/****** Object:  Function [archive].[fn_Calc]"));
    assert!(archive.ends_with("CREATE FUNCTION archive.fn_Calc() RETURNS int AS BEGIN RETURN 2 END"));

    assert_eq!(report.locked_objects, vec!["fn_Lock", "hr.fn_Lock"]);
    let csv = std::fs::read_to_string(temp.path().join("Reference/Sales_Locked_Objects.csv")).unwrap();
    assert_eq!(csv, "Database,Object Name\nSales,fn_Lock\nSales,hr.fn_Lock\n");
}

#[tokio::test]
async fn test_table_without_columns_is_locked() {
    let temp = tempfile::tempdir().unwrap();
    let db = FakeDatabase::default()
        .table("Hidden", Vec::new())
        .table("Visible", vec![ColumnDescriptor::new("Id", "int", None, false)]);
    let mut session = FakeSession::new(vec![("HR", db)]);

    let report = export_database(&mut session, "HR", &options(temp.path())).await;

    assert!(report.is_success());
    assert_eq!(report.locked_objects, vec!["Hidden"]);
    assert_eq!(sql_files(&temp.path().join("HR_Tables")), vec!["Visible.sql"]);
}

#[tokio::test]
async fn test_retrieval_failure_aborts_pass_but_keeps_locked_report() {
    let temp = tempfile::tempdir().unwrap();
    let db = FakeDatabase::default()
        .function("fn_A", Source::Locked)
        .function("fn_B", Source::Broken)
        .function("fn_C", Source::Text(vec!["CREATE FUNCTION c"]));
    let mut session = FakeSession::new(vec![("Sales", db)]);

    let report = export_database(&mut session, "Sales", &options(temp.path())).await;

    let failure = report.failure.as_ref().expect("pass must fail");
    assert_eq!(failure.stage, FailureStage::Catalog);
    assert!(failure.error_message.contains("connection reset by peer"));
    assert!(!temp.path().join("Sales_Functions/fn_C.sql").exists());
    assert!(temp.path().join("Reference/Sales_Locked_Objects.csv").exists());
}

#[tokio::test]
async fn test_selection_failure_continues_with_next_database() {
    let temp = tempfile::tempdir().unwrap();
    let session = FakeSession::new(vec![("Sales", sales())]);
    let calls = Arc::clone(&session.calls);
    let config = config(temp.path(), &["Missing", "Sales"]);

    let summary = run(&config, async move { Ok(Box::new(session) as Box<dyn CatalogSession>) }).await;

    assert!(summary.connected);
    assert!(!summary.success);
    assert_eq!(summary.exit_code(), 1);
    assert_eq!(summary.databases.len(), 2);

    let missing = &summary.databases[0];
    assert_eq!(missing.database, "Missing");
    assert_eq!(missing.failure.as_ref().unwrap().stage, FailureStage::Selection);

    let sales = &summary.databases[1];
    assert!(sales.is_success());
    assert_eq!(sales.exported(), 3);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.as_slice(), ["use Missing", "use Sales", "close"]);
}

#[tokio::test]
async fn test_locked_objects_alone_keep_run_successful() {
    let temp = tempfile::tempdir().unwrap();
    let session = FakeSession::new(vec![("Sales", sales()), ("Empty", FakeDatabase::default())]);
    let config = config(temp.path(), &["Sales", "Empty"]);

    let summary = run(&config, async move { Ok(Box::new(session) as Box<dyn CatalogSession>) }).await;

    assert!(summary.success);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.databases[0].locked_objects, vec!["fn_Secret"]);
}

#[tokio::test]
async fn test_connection_failure_attempts_no_database() {
    let temp = tempfile::tempdir().unwrap();
    let config = config(temp.path(), &["Sales"]);

    let summary = run(&config, async {
        Err(DbExportError::authentication(
            "login to fake",
            "Login failed for user 'reader'.",
        ))
    })
    .await;

    assert!(!summary.connected);
    assert!(!summary.success);
    assert!(summary.databases.is_empty());
    let message = summary.connection_error.unwrap();
    assert!(message.contains("Login failed"));
    assert!(!message.contains("pw"));
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_invalid_config_fails_before_connecting() {
    let temp = tempfile::tempdir().unwrap();
    let config = config(temp.path(), &[]);
    let connected = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&connected);

    let summary = run(&config, async move {
        flag.store(true, Ordering::SeqCst);
        Ok(Box::new(FakeSession::new(Vec::new())) as Box<dyn CatalogSession>)
    })
    .await;

    assert!(!connected.load(Ordering::SeqCst), "connect must not be awaited");
    assert!(!summary.connected);
    assert!(!summary.success);
    assert_eq!(summary.exit_code(), 1);
    assert!(summary.databases.is_empty());
    assert!(summary.connection_error.is_none());
    let message = summary.configuration_error.unwrap();
    assert!(message.contains("at least one database must be configured"));
}

#[tokio::test]
async fn test_rerun_is_identical_except_script_date() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    for root in [first.path(), second.path()] {
        let mut session = FakeSession::new(vec![("Sales", sales())]);
        let report = export_database(&mut session, "Sales", &options(root)).await;
        assert!(report.is_success());
    }

    for relative in [
        "Sales_Functions/fn_Total.sql",
        "Sales_Functions/fn_Tax.sql",
        "Sales_Tables/Customers.sql",
        "Reference/Sales_Locked_Objects.csv",
    ] {
        let a = std::fs::read_to_string(first.path().join(relative)).unwrap();
        let b = std::fs::read_to_string(second.path().join(relative)).unwrap();
        assert_eq!(strip_script_date(&a), strip_script_date(&b), "{}", relative);
    }
}

#[tokio::test]
async fn test_summary_serializes_to_json() {
    let temp = tempfile::tempdir().unwrap();
    let session = FakeSession::new(vec![("Sales", sales())]);
    let config = config(temp.path(), &["Sales"]);

    let summary = run(&config, async move { Ok(Box::new(session) as Box<dyn CatalogSession>) }).await;
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["databases"][0]["locked_objects"][0], "fn_Secret");
    assert_eq!(json["databases"][0]["kinds"][0]["kind"], "function");
    assert_eq!(json["databases"][0]["kinds"][0]["exported"], 2);
}

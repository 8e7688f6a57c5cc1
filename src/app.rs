//! Controllers and bootstrap routes of the bundled demo site.

use std::sync::Arc;

use serde_json::{json, Value};

use campus_kernel::persistence::{Database, DatabaseError, QueryResult, Row};
use campus_kernel::{
    ActionContext, ActionResult, ControllerRegistry, Handler, KernelBuilder, ViewData,
};

#[derive(Default)]
pub struct HomeController;

impl HomeController {
    fn index(&mut self, cx: &mut ActionContext<'_>) -> ActionResult {
        let mut data = ViewData::new();
        data.insert("title".into(), json!("Welcome"));
        data.insert("notices".into(), json!(["Term starts on Monday", "Library closed Friday"]));
        cx.page("index", data)
    }

    fn about(&mut self, cx: &mut ActionContext<'_>) -> ActionResult {
        let mut data = ViewData::new();
        data.insert("title".into(), json!("About"));
        cx.page("about", data)
    }
}

#[derive(Default)]
pub struct UsersController;

impl UsersController {
    fn index(&mut self, cx: &mut ActionContext<'_>) -> ActionResult {
        let result = cx
            .database()?
            .execute("SELECT id, name, grade FROM students ORDER BY name", &[])?;
        let mut data = ViewData::new();
        data.insert("title".into(), json!("Students"));
        data.insert(
            "students".into(),
            Value::Array(result.rows.into_iter().map(Value::Object).collect()),
        );
        cx.page("index", data)
    }
}

/// Fixed in-memory roster standing in for a real database.
#[derive(Debug)]
pub struct Roster {
    students: Vec<Row>,
}

impl Default for Roster {
    fn default() -> Self {
        let students = [
            (1, "Ada Lovelace", 11),
            (2, "Alan Turing", 12),
            (3, "Grace Hopper", 10),
        ]
        .into_iter()
        .filter_map(
            |(id, name, grade)| match json!({ "id": id, "name": name, "grade": grade }) {
                Value::Object(row) => Some(row),
                _ => None,
            },
        )
        .collect();
        Self { students }
    }
}

impl Database for Roster {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError> {
        if !params.is_empty() {
            return Err(DatabaseError::Parameters {
                expected: 0,
                actual: params.len(),
            });
        }
        if sql.trim_start().to_ascii_uppercase().starts_with("SELECT") {
            Ok(QueryResult::from_rows(self.students.clone()))
        } else {
            Err(DatabaseError::Statement(format!("read-only roster cannot run: {}", sql)))
        }
    }
}

fn register_controllers(registry: &mut ControllerRegistry) {
    registry
        .register::<HomeController>("App", "Home", "HomeController")
        .action("index", HomeController::index)
        .action("about", HomeController::about);
    registry
        .register::<UsersController>("Admin", "Users", "UsersController")
        .action("index", UsersController::index);
}

/// Wire the demo site into `builder`.
pub fn install(builder: KernelBuilder) -> KernelBuilder {
    builder
        .database(Arc::new(Roster::default()))
        .controllers(register_controllers)
        .routes(|r| {
            r.get(
                "/health",
                Handler::inline(|cx| {
                    cx.echo("ok");
                    Ok(())
                }),
            );
        })
}

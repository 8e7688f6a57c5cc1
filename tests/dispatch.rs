//! End-to-end dispatch through the HTTP router, with sites on disk.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use campus_kernel::http::X_REQUEST_ID;
use campus_kernel::persistence::{Database, DatabaseError, QueryResult};
use campus_kernel::routing::Method;
use campus_kernel::view::RenderWarning;
use campus_kernel::{
    ActionContext, ActionResult, ControllerRegistry, Handler, HttpServer, Kernel, KernelBuilder,
    KernelConfig, ViewData,
};

mod common;
use common::{route, send, Site};

#[derive(Default)]
struct HomeController;

impl HomeController {
    fn index(&mut self, cx: &mut ActionContext<'_>) -> ActionResult {
        let mut data = ViewData::new();
        data.insert("title".into(), json!("Home"));
        cx.page("index", data)
    }

    fn bare(&mut self, cx: &mut ActionContext<'_>) -> ActionResult {
        let mut data = ViewData::new();
        data.insert("title".into(), json!("Home"));
        cx.page_with("layouts/none", "index", data)
    }

    fn slow(&mut self, cx: &mut ActionContext<'_>) -> ActionResult {
        std::thread::sleep(Duration::from_millis(1500));
        cx.echo("late");
        Ok(())
    }
}

#[derive(Default)]
struct UsersController;

impl UsersController {
    fn index(&mut self, cx: &mut ActionContext<'_>) -> ActionResult {
        let rows = cx.database()?.execute("SELECT name FROM students", &[])?.rows;
        let names: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("name").and_then(|v| v.as_str()).map(str::to_string))
            .collect();
        cx.echo(&names.join(","));
        Ok(())
    }
}

struct Students;

impl Database for Students {
    fn execute(
        &self,
        _sql: &str,
        _params: &[serde_json::Value],
    ) -> Result<QueryResult, DatabaseError> {
        let rows = ["Ada", "Alan"]
            .iter()
            .filter_map(|name| json!({ "name": name }).as_object().cloned())
            .collect();
        Ok(QueryResult::from_rows(rows))
    }
}

struct Offline;

impl Database for Offline {
    fn execute(
        &self,
        _sql: &str,
        _params: &[serde_json::Value],
    ) -> Result<QueryResult, DatabaseError> {
        Err(DatabaseError::Connection("refused".into()))
    }
}

fn controllers(registry: &mut ControllerRegistry) {
    registry
        .register::<HomeController>("App", "Home", "HomeController")
        .action("index", HomeController::index)
        .action("bare", HomeController::bare)
        .action("slow", HomeController::slow);
    registry
        .register::<UsersController>("Admin", "Users", "UsersController")
        .action("index", UsersController::index);
}

fn site() -> Site {
    let site = Site::new();
    let routes = [
        route("GET", "/home", "HomeController@index"),
        route("GET", "/bare", "HomeController@bare"),
        route("GET", "/slow", "HomeController@slow"),
        route("GET", "/broken", "BadFormatNoAtSign"),
        route("GET", "/ghost", "GhostController@index"),
        route("GET", "/nomethod", "HomeController@nope"),
    ]
    .concat();
    site.file("modules/app/home/routes.toml", &routes)
        .file("modules/app/home/Views/index.html", "<h1>{{ title }}</h1>")
        .file("views/layouts/main.html", "<html>{{{ content }}}</html>");
    site
}

fn builder(config: KernelConfig) -> KernelBuilder {
    Kernel::builder(config).controllers(controllers)
}

fn server(builder: KernelBuilder) -> HttpServer {
    HttpServer::new(Arc::new(builder.build().unwrap()))
}

#[tokio::test]
async fn test_home_route_renders_through_layout() {
    let site = site();
    let server = server(builder(site.config()));

    let (status, headers, body) = send(server.router(), "GET", "/home").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html><h1>Home</h1></html>");
    assert!(headers.contains_key(X_REQUEST_ID));

    let (status, _, body) = send(server.router(), "GET", "/home/?tab=news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html><h1>Home</h1></html>");
}

#[tokio::test]
async fn test_unregistered_path_is_404_naming_the_path() {
    let site = site();
    let server = server(builder(site.config()));

    let (status, _, body) = send(server.router(), "GET", "/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("missing"), "body: {}", body);

    let (status, _, _) = send(server.router(), "POST", "/home").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(server.router(), "PATCH", "/home").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_handler_without_at_is_invalid_callback() {
    let site = site();
    let server = server(builder(site.config()));

    let (status, _, body) = send(server.router(), "GET", "/broken").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Invalid callback format"), "body: {}", body);
}

#[tokio::test]
async fn test_unknown_controller_and_method_are_404() {
    let site = site();
    let server = server(builder(site.config()));

    let (status, _, body) = send(server.router(), "GET", "/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("App::Controllers::Home::GhostController"), "body: {}", body);

    let (status, _, body) = send(server.router(), "GET", "/nomethod").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Method not found"), "body: {}", body);
}

#[tokio::test]
async fn test_missing_layout_degrades_to_raw_view() {
    let site = site();
    let server = server(builder(site.config()));

    let (status, _, body) = send(server.router(), "GET", "/bare").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>Home</h1>");

    let config = site.config();
    let kernel = builder(site.config()).build().unwrap();
    let renderer = campus_kernel::ViewRenderer::new(
        Arc::new(campus_kernel::source::DiskTree),
        (&config).into(),
        Arc::new(campus_kernel::ServiceRegistry::new()),
    )
    .with_manifest(kernel.manifest());
    let rendered = renderer
        .render_with_layout("layouts/none", "App", "Home", "index", ViewData::new())
        .unwrap();
    assert!(matches!(rendered.warnings.as_slice(), [RenderWarning::MissingLayout(_)]));
}

#[tokio::test]
async fn test_bootstrap_route_resolves_module_from_path() {
    let site = site();
    let builder = builder(site.config())
        .database(Arc::new(Students))
        .routes(|r| {
            r.get("/admin/users", "UsersController@index");
            r.get(
                "/ping",
                Handler::inline(|cx| {
                    cx.echo("pong");
                    Ok(())
                }),
            );
        });
    let server = server(builder);

    let (status, _, body) = send(server.router(), "GET", "/admin/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Ada,Alan");

    let (_, _, body) = send(server.router(), "GET", "/ping").await;
    assert_eq!(body, "pong");
}

#[tokio::test]
async fn test_database_failure_is_500() {
    let site = site();
    let builder = builder(site.config())
        .database(Arc::new(Offline))
        .routes(|r| {
            r.get("/admin/users", "UsersController@index");
        });
    let server = server(builder);

    let (status, _, body) = send(server.router(), "GET", "/admin/users").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("refused"), "body: {}", body);
}

#[tokio::test]
async fn test_production_mode_hides_details() {
    let site = site();
    let mut config = site.config();
    config.dispatch.expose_errors = false;
    let server = server(builder(config));

    let (status, _, body) = send(server.router(), "GET", "/broken").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Internal Server Error");

    let (_, _, body) = send(server.router(), "GET", "/missing").await;
    assert_eq!(body, "Not Found");
}

#[tokio::test]
async fn test_request_deadline_is_504() {
    let site = site();
    let mut config = site.config();
    config.timeouts.request_secs = 1;
    let server = server(builder(config));

    let (status, _, _) = send(server.router(), "GET", "/slow").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_discovery_is_case_normalized() {
    let site = site();
    let kernel = builder(site.config()).build().unwrap();

    let route = kernel.routes().lookup(Method::Get, "home").unwrap();
    assert_eq!(route.origin.as_ref().map(ToString::to_string).as_deref(), Some("App/Home"));
    assert_eq!(kernel.manifest().entries[0].directory, site.root().join("modules/app/home"));
}

#[tokio::test]
async fn test_config_file_feeds_typed_config_and_store() {
    let site = site();
    let config = site.config();
    site.file(
        "kernel.toml",
        &format!(
            "[paths]\nmodules_root = {:?}\nviews_root = {:?}\n\n\
             [app]\nname = \"Greenfield\"\nbase_url = \"https://school.example\"\n",
            config.paths.modules_root, config.paths.views_root
        ),
    );
    site.file("modules/app/home/routes.toml", &route("GET", "/about", "HomeController@about"))
        .file("modules/app/home/Views/about.html", "{{ config.app.name }}");

    let kernel = KernelBuilder::from_file(&site.root().join("kernel.toml"))
        .unwrap()
        .controllers(|registry| {
            registry
                .register::<HomeController>("App", "Home", "HomeController")
                .action("about", |_c, cx| cx.render("about", &ViewData::new()));
        })
        .build()
        .unwrap();

    assert_eq!(kernel.store().get("app.name", json!(null)), json!("Greenfield"));
    let server = HttpServer::new(Arc::new(kernel));
    let (status, _, body) = send(server.router(), "GET", "/about").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Greenfield");
}

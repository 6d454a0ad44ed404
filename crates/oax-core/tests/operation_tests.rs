use std::sync::{Arc, Mutex};

use oax_core::error::ConfigError;
use oax_core::parse::media_type::best_media_type;
use oax_core::transport::from_fn;
use oax_core::{
    BodyObject, ClientConfig, Document, DocumentRegistry, Error, HttpErrorKind, HttpMethod,
    HttpRequest, HttpResponse, RequestConfig, StatusClass, Transport, parse,
};
use serde_json::json;

const PETSTORE_V3: &str = include_str!("fixtures/petstore-v3.yaml");
const PETSTORE_V2: &str = include_str!("fixtures/petstore-v2.yaml");

fn build(input: &str, config: ClientConfig, transport: impl Transport + 'static) -> Document {
    Document::builder(parse::from_yaml(input).expect("fixture should parse"))
        .registry(DocumentRegistry::new())
        .config(config)
        .transport(transport)
        .build()
        .expect("fixture should build")
}

/// A transport answering every request with `response`, recording what was sent.
fn recording(
    response: HttpResponse,
) -> (
    Arc<Mutex<Vec<HttpRequest>>>,
    impl Fn(&HttpRequest) -> Result<HttpResponse, oax_core::error::TransportError> + Send + Sync,
) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&sent);
    let transport = from_fn(move |request| {
        log.lock().unwrap().push(request.clone());
        Ok(response.clone())
    });
    (sent, transport)
}

fn json_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse::new(status, Vec::new(), body).with_header("Content-Type", "application/json")
}

#[test]
fn get_pet_end_to_end() {
    let (sent, transport) = recording(json_response(200, r#"{"name":"Rex"}"#));
    let doc = build(PETSTORE_V3, ClientConfig::default(), transport);

    let body = doc
        .call("getPet", RequestConfig::new().param("id", "42"))
        .unwrap();
    let pet = body.as_instance().expect("a Pet instance");
    assert_eq!(pet.get("name").unwrap().unwrap().as_str(), Some("Rex"));
    assert_eq!(
        pet.schema().map(|s| s.pointer()),
        Some("/components/schemas/Pet")
    );

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, HttpMethod::Get);
    assert_eq!(sent[0].url, "https://eu.pets.example.com/v1/pets/42");
    assert!(sent[0].header("user-agent").unwrap().starts_with("oax/"));
    assert_eq!(sent[0].body, None);
}

#[test]
fn mutable_and_immutable_results() {
    let (_, transport) = recording(json_response(200, r#"{"name":"Rex"}"#));
    let doc = build(PETSTORE_V3, ClientConfig::default(), transport);

    let frozen = doc
        .call("getPet", RequestConfig::new().param("id", "42"))
        .unwrap();
    let mut frozen = frozen.as_instance().expect("a Pet instance").clone();
    assert!(!frozen.is_mutable());
    assert!(frozen.set("name", json!("Max")).is_err());

    let body = doc
        .call_mutable("getPet", RequestConfig::new().param("id", "42"))
        .unwrap();
    let mut pet = body.as_instance().expect("a Pet instance").clone();
    assert!(pet.is_mutable());
    pet.set("name", json!("Max")).unwrap();
    assert_eq!(pet.get("name").unwrap().unwrap().as_str(), Some("Max"));

    let request = doc
        .operation("getPet")
        .unwrap()
        .build_request(RequestConfig::new().param("id", "7"))
        .unwrap();
    assert!(request.run_mutable().unwrap().as_instance().unwrap().is_mutable());
}

#[test]
fn path_expansion() {
    let (_, transport) = recording(json_response(200, "{}"));
    let doc = build(PETSTORE_V3, ClientConfig::default(), transport);
    let op = doc.operation("getPet").unwrap();

    let request = op
        .build_request(RequestConfig::new().path_param("id", "7"))
        .unwrap();
    assert!(request.url().unwrap().ends_with("/pets/7"));

    let request = op.build_request(RequestConfig::new()).unwrap();
    match request.url().unwrap_err() {
        Error::Config(ConfigError::MissingPathParams { missing, .. }) => {
            assert_eq!(missing, vec!["id".to_string()]);
        }
        other => panic!("expected missing path params, got {other:?}"),
    }

    let request = op
        .build_request(RequestConfig::new().path_param("id", ""))
        .unwrap();
    match request.url().unwrap_err() {
        Error::Config(ConfigError::EmptyPathParams { empty, .. }) => {
            assert_eq!(empty, vec!["id".to_string()]);
        }
        other => panic!("expected empty path params, got {other:?}"),
    }

    let request = op
        .build_request(RequestConfig::new().path_param("id", "a b/c"))
        .unwrap();
    assert!(request.url().unwrap().ends_with("/pets/a%20b%2Fc"));
}

#[test]
fn base_url_from_servers() {
    let mut root = parse::from_yaml(PETSTORE_V3).unwrap();
    let (_, transport) = recording(json_response(200, "{}"));
    let doc = build(PETSTORE_V3, ClientConfig::default(), transport);
    assert_eq!(
        doc.base_url(&doc.server_selection()).unwrap().as_deref(),
        Some("https://eu.pets.example.com/v1")
    );
    let request = doc
        .operation("listPets")
        .unwrap()
        .build_request(RequestConfig::new().server_variable("region", "us"))
        .unwrap();
    assert_eq!(request.url().unwrap(), "https://us.pets.example.com/v1/pets");

    root["servers"]
        .as_array_mut()
        .unwrap()
        .push(json!({"url": "https://backup.pets.example.com"}));
    let two_servers = Document::builder(root)
        .registry(DocumentRegistry::new())
        .build()
        .unwrap();
    assert_eq!(two_servers.base_url(&two_servers.server_selection()).unwrap(), None);
    let op = two_servers.operation("listPets").unwrap();
    let err = op.build_request(RequestConfig::new()).unwrap().url().unwrap_err();
    assert_eq!(
        err.to_string(),
        "no base_url has been specified for operation listPets"
    );
    let request = op.build_request(RequestConfig::new().server(1)).unwrap();
    assert_eq!(request.url().unwrap(), "https://backup.pets.example.com/pets");
}

#[test]
fn media_type_negotiation() {
    assert_eq!(
        best_media_type(&["application/json"]).as_deref(),
        Some("application/json")
    );
    assert_eq!(
        best_media_type(&["application/xml", "application/json"]).as_deref(),
        Some("application/json")
    );
    // a lone candidate is used as is, even when no body can be generated for it
    assert_eq!(
        best_media_type(&["application/xml"]).as_deref(),
        Some("application/xml")
    );
    assert_eq!(best_media_type(&["application/xml", "text/csv"]), None);

    let (sent, transport) = recording(json_response(201, r#"{"name":"Rex"}"#));
    let doc = build(PETSTORE_V3, ClientConfig::default(), transport);
    let op = doc.operation("createPet").unwrap();
    assert_eq!(
        op.request_media_type().unwrap().as_deref(),
        Some("application/json")
    );

    let created = op
        .run(RequestConfig::new().body_object(json!({"name": "Rex"})))
        .unwrap();
    assert_eq!(created.to_json(), json!({"name": "Rex"}));
    let sent = sent.lock().unwrap();
    assert_eq!(sent[0].method, HttpMethod::Post);
    assert_eq!(sent[0].header("Content-Type"), Some("application/json"));
    assert_eq!(sent[0].body.as_deref(), Some("{\n  \"name\": \"Rex\"\n}"));
}

#[test]
fn error_statuses_map_to_kinds() {
    let (_, transport) = recording(json_response(404, r#"{"message":"no such pet"}"#));
    let doc = build(PETSTORE_V3, ClientConfig::default(), transport);
    let err = doc
        .call("getPet", RequestConfig::new().param("id", "1"))
        .unwrap_err();
    let http = err.as_http().expect("an HTTP error");
    assert_eq!(http.kind(), HttpErrorKind::NotFound404);
    assert_eq!(http.kind().class(), StatusClass::Client);
    assert!(http.kind().is_client_error());
    // the error body is materialized with the `default` response schema
    let body = http.response_object().as_instance().expect("an Error instance");
    assert_eq!(body.get("message").unwrap().unwrap().as_str(), Some("no such pet"));
    assert!(err.to_string().starts_with("Error calling operation getPet:"));

    let (_, transport) = recording(HttpResponse::new(503, Vec::new(), "try later"));
    let doc = build(PETSTORE_V3, ClientConfig::default(), transport);
    let err = doc
        .call("getPet", RequestConfig::new().param("id", "1"))
        .unwrap_err();
    let http = err.as_http().expect("an HTTP error");
    assert_eq!(http.kind(), HttpErrorKind::ServiceUnavailable503);
    assert!(http.kind().is_server_error());
    assert_eq!(http.response_object(), &BodyObject::Text("try later".to_string()));

    // the exchange itself is captured whatever the status
    let exchange = doc
        .call_exchange("getPet", RequestConfig::new().param("id", "1"))
        .unwrap();
    assert_eq!(exchange.response().status, 503);
    assert_eq!(HttpErrorKind::from_status(200), None);
}

#[test]
fn named_parameters_are_routed_by_location() {
    let (sent, transport) = recording(json_response(200, "[]"));
    let doc = build(PETSTORE_V3, ClientConfig::default(), transport);
    let body = doc
        .call(
            "listPets",
            RequestConfig::new()
                .param("limit", "10")
                .param("X-Request-Id", "abc"),
        )
        .unwrap();
    assert!(body.as_instance().unwrap().is_empty());
    let sent = sent.lock().unwrap();
    assert_eq!(sent[0].url, "https://eu.pets.example.com/v1/pets?limit=10");
    assert_eq!(sent[0].header("x-request-id"), Some("abc"));
}

#[test]
fn parameter_errors() {
    let (_, transport) = recording(json_response(200, "[]"));
    let doc = build(PETSTORE_V3, ClientConfig::default(), transport);
    let op = doc.operation("listOwnerPets").unwrap();

    let err = op
        .build_request(RequestConfig::new().param("owner", "ann"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::AmbiguousParameter { .. })
    ));
    let err = op
        .build_request(RequestConfig::new().param("session", "s"))
        .unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::CookieParameter { .. })));
    let err = op
        .build_request(RequestConfig::new().param("nope", "x"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "There is no parameter named nope on operation listOwnerPets"
    );

    // explicit maps side-step the ambiguity
    let request = op
        .build_request(
            RequestConfig::new()
                .path_param("owner", "ann")
                .query_param("owner", "bob"),
        )
        .unwrap();
    assert_eq!(request.path().unwrap(), "/owners/ann/pets?owner=bob");
}

#[test]
fn operations_are_listed_and_found() {
    let (_, transport) = recording(json_response(200, "{}"));
    let doc = build(PETSTORE_V3, ClientConfig::default(), transport);
    assert_eq!(doc.operations().unwrap().len(), 5);
    assert_eq!(doc.operations_tagged("pets").unwrap().len(), 3);
    assert!(matches!(
        doc.operation("missing").unwrap_err(),
        Error::Config(ConfigError::UnknownOperation(_))
    ));

    let delete = doc
        .operation_at(HttpMethod::Delete, "/pets/{id}")
        .unwrap()
        .expect("DELETE /pets/{id}");
    assert_eq!(delete.operation_id(), None);
    assert_eq!(delete.human_id(), "path: /pets/{id}, method: delete");
    // path-item parameters apply to every operation under it
    assert!(delete.parameters().unwrap().iter().any(|p| p.name == "id"));
}

#[test]
fn client_config_layers_under_request_config() {
    let config: ClientConfig = serde_yaml_ng::from_str(
        r#"
headers:
  X-Api-Key: document-key
operations:
  getPet:
    base_url: http://localhost:8080
    headers:
      X-Trace: "1"
    query_params:
      verbose: "true"
"#,
    )
    .unwrap();
    let (sent, transport) = recording(json_response(200, r#"{"name":"Rex"}"#));
    let doc = build(PETSTORE_V3, config, transport);

    doc.call(
        "getPet",
        RequestConfig::new()
            .path_param("id", "1")
            .header("X-Api-Key", "request-key"),
    )
    .unwrap();
    doc.call("listPets", RequestConfig::new()).unwrap();

    let sent = sent.lock().unwrap();
    assert_eq!(sent[0].url, "http://localhost:8080/pets/1?verbose=true");
    assert_eq!(sent[0].header("X-Api-Key"), Some("request-key"));
    assert_eq!(sent[0].header("X-Trace"), Some("1"));
    assert_eq!(sent[1].url, "https://eu.pets.example.com/v1/pets");
    assert_eq!(sent[1].header("X-Api-Key"), Some("document-key"));
    assert_eq!(sent[1].header("X-Trace"), None);
}

#[test]
fn swagger_documents() {
    let (sent, transport) = recording(json_response(201, r#"{"id":1,"name":"Rex"}"#));
    let doc = build(PETSTORE_V2, ClientConfig::default(), transport);
    assert!(doc.is_v2());
    assert_eq!(
        doc.base_url(&doc.server_selection()).unwrap().as_deref(),
        Some("https://pets.example.com/v2")
    );

    let pet = doc
        .call("addPet", RequestConfig::new().body_object(json!({"name": "Rex"})))
        .unwrap();
    assert_eq!(
        pet.as_instance().unwrap().get("id").unwrap().unwrap().as_i64(),
        Some(1)
    );

    let update = doc.operation("updatePet").unwrap();
    assert_eq!(
        update.request_schema(None).unwrap().map(|s| s.pointer().to_string()),
        Some("/definitions/Pet".to_string())
    );
    let request = update
        .build_request(RequestConfig::new().param("petId", "1").scheme("http"))
        .unwrap();
    assert_eq!(request.url().unwrap(), "http://pets.example.com/v2/pets/1");

    let sent = sent.lock().unwrap();
    assert_eq!(sent[0].url, "https://pets.example.com/v2/pets");
    assert_eq!(
        sent[0].header("Content-Type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(sent[0].body.as_deref(), Some("name=Rex"));
}

#[test]
fn structured_bodies_need_a_supported_media_type() {
    let doc = Document::builder(json!({
        "openapi": "3.0.0",
        "servers": [{"url": "https://pets.example.com"}],
        "paths": {"/pets": {"put": {
            "operationId": "replacePets",
            "requestBody": {"content": {"application/xml": {}}},
            "responses": {"204": {"description": "done"}},
        }}},
    }))
    .registry(DocumentRegistry::new())
    .build()
    .unwrap();
    let op = doc.operation("replacePets").unwrap();
    assert_eq!(
        op.request_media_type().unwrap().as_deref(),
        Some("application/xml")
    );

    let request = op
        .build_request(RequestConfig::new().body_object(json!({"name": "Rex"})))
        .unwrap();
    assert!(matches!(
        request.http_request().unwrap_err(),
        Error::Config(ConfigError::UnsupportedMediaType { .. })
    ));

    let request = op
        .build_request(RequestConfig::new().raw_body("<pets/>"))
        .unwrap();
    let http = request.http_request().unwrap();
    assert_eq!(http.header("content-type"), Some("application/xml"));
    assert_eq!(http.body.as_deref(), Some("<pets/>"));
}

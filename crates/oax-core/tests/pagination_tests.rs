use std::sync::{Arc, Mutex};

use oax_core::error::{PaginationError, TransportError};
use oax_core::transport::from_fn;
use oax_core::{
    ClientConfig, Document, DocumentRegistry, Error, Exchange, HttpRequest, HttpResponse,
    RequestConfig, parse,
};

const PETSTORE_V3: &str = include_str!("fixtures/petstore-v3.yaml");

/// Serves canned pages keyed by URL and records every URL requested.
fn serve(pages: Vec<(&'static str, HttpResponse)>) -> (Document, Arc<Mutex<Vec<String>>>) {
    let requested = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requested);
    let transport = from_fn(move |request: &HttpRequest| {
        log.lock().unwrap().push(request.url.clone());
        pages
            .iter()
            .find(|(url, _)| *url == request.url)
            .map(|(_, response)| response.clone())
            .ok_or_else(|| TransportError::InvalidRequest(format!("unexpected {}", request.url)))
    });
    let document = Document::builder(parse::from_yaml(PETSTORE_V3).unwrap())
        .registry(DocumentRegistry::new())
        .config(ClientConfig::default())
        .transport(transport)
        .build()
        .unwrap();
    (document, requested)
}

fn page(body: &str, next: Option<&str>) -> HttpResponse {
    let response =
        HttpResponse::new(200, Vec::new(), body).with_header("Content-Type", "application/json");
    match next {
        Some(next) => response.with_header("Link", format!(r#"<{next}>; rel="next""#)),
        None => response,
    }
}

const PAGE_1: &str = "https://eu.pets.example.com/v1/pets?limit=2";
const PAGE_2: &str = "https://eu.pets.example.com/v1/pets?limit=2&page=2";
const PAGE_3: &str = "https://eu.pets.example.com/v1/pets?limit=2&page=3";

#[test]
fn follows_next_links_until_there_are_none() {
    let (doc, requested) = serve(vec![
        (PAGE_1, page(r#"[{"name":"a"},{"name":"b"}]"#, Some(PAGE_2))),
        // relative targets resolve against the request URL
        (PAGE_2, page(r#"[{"name":"c"},{"name":"d"}]"#, Some("/v1/pets?limit=2&page=3"))),
        (PAGE_3, page(r#"[{"name":"e"}]"#, None)),
    ]);
    let op = doc.operation("listPets").unwrap();
    let exchanges: Vec<Exchange> = op
        .each_link_page(
            RequestConfig::new()
                .query_param("limit", "2")
                .header("Authorization", "Bearer t"),
        )
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(exchanges.len(), 3);
    assert_eq!(*requested.lock().unwrap(), vec![PAGE_1, PAGE_2, PAGE_3]);
    for exchange in &exchanges {
        assert_eq!(exchange.request().header("Authorization"), Some("Bearer t"));
    }
    let names: Vec<String> = exchanges
        .iter()
        .flat_map(|e| e.body_object(false).unwrap().to_json().as_array().cloned().unwrap())
        .filter_map(|pet| pet["name"].as_str().map(str::to_string))
        .collect();
    assert_eq!(names, ["a", "b", "c", "d", "e"]);
}

#[test]
fn path_params_come_from_the_link() {
    let (doc, requested) = serve(vec![
        (
            "https://eu.pets.example.com/v1/owners/ann/pets",
            page("[]", Some("https://eu.pets.example.com/v1/owners/bob/pets?cursor=x")),
        ),
        (
            "https://eu.pets.example.com/v1/owners/bob/pets?cursor=x",
            page("[]", None),
        ),
    ]);
    let count = doc
        .operation("listOwnerPets")
        .unwrap()
        .each_link_page(RequestConfig::new().path_param("owner", "ann"))
        .map(|page| page.unwrap())
        .count();
    assert_eq!(count, 2);
    assert_eq!(requested.lock().unwrap().len(), 2);
}

#[test]
fn repeated_link_query_keys_keep_the_last_value() {
    let (doc, requested) = serve(vec![
        (
            PAGE_1,
            page("[]", Some("https://eu.pets.example.com/v1/pets?tag=a&limit=2&tag=b")),
        ),
        ("https://eu.pets.example.com/v1/pets?tag=b&limit=2", page("[]", None)),
    ]);
    let pages: Vec<Exchange> = doc
        .operation("listPets")
        .unwrap()
        .each_link_page(RequestConfig::new().query_param("limit", "2"))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(
        requested.lock().unwrap()[1],
        "https://eu.pets.example.com/v1/pets?tag=b&limit=2"
    );
}

#[test]
fn multiple_next_links_fail_after_the_page() {
    let response = page("[]", None).with_header(
        "Link",
        format!(r#"<{PAGE_2}>; rel="next", <{PAGE_3}>; rel="next""#),
    );
    let (doc, _) = serve(vec![(PAGE_1, response)]);
    let mut pages = doc
        .operation("listPets")
        .unwrap()
        .each_link_page(RequestConfig::new().query_param("limit", "2"));

    assert!(pages.next().unwrap().is_ok());
    match pages.next().unwrap().unwrap_err() {
        Error::Pagination(PaginationError::MultipleNextLinks { links, .. }) => {
            assert_eq!(links, vec![PAGE_2, PAGE_3]);
        }
        other => panic!("expected multiple next links, got {other:?}"),
    }
    assert!(pages.next().is_none());
}

#[test]
fn links_outside_the_operation_fail() {
    let (doc, _) = serve(vec![(
        PAGE_1,
        page("[]", Some("https://eu.pets.example.com/v1/owners/ann/pets")),
    )]);
    let results: Vec<_> = doc
        .operation("listPets")
        .unwrap()
        .each_link_page(RequestConfig::new().query_param("limit", "2"))
        .collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(Error::Pagination(PaginationError::LinkMismatch { .. }))
    ));
}

#[test]
fn error_pages_end_iteration_unless_told_otherwise() {
    let failing = || {
        HttpResponse::new(500, Vec::new(), "boom")
            .with_header("Link", format!(r#"<{PAGE_2}>; rel="next""#))
    };

    let (doc, _) = serve(vec![(PAGE_1, failing()), (PAGE_2, page("[]", None))]);
    let op = doc.operation("listPets").unwrap();
    let results: Vec<_> = op
        .each_link_page(RequestConfig::new().query_param("limit", "2"))
        .collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].as_ref().unwrap_err().as_http().is_some());

    let (doc, requested) = serve(vec![(PAGE_1, failing()), (PAGE_2, page("[]", None))]);
    let statuses: Vec<u16> = doc
        .operation("listPets")
        .unwrap()
        .each_link_page(RequestConfig::new().query_param("limit", "2"))
        .raise_on_http_error(false)
        .map(|page| page.unwrap().response().status)
        .collect();
    assert_eq!(statuses, vec![500, 200]);
    assert_eq!(requested.lock().unwrap().len(), 2);
}

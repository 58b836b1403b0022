use crate::errors::{FakeLambdaError, Result};
use crate::identity;
use crate::metrics_defs::{LIST_FUNCTIONS_REQUESTS, UNSUPPORTED_REQUESTS};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode, Uri};
use registry::{FunctionDescriptor, FunctionRegistry};
use serde::Serialize;
use shared::counter;
use shared::http::make_text_response;
use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;

pub type LambdaBody = BoxBody<Bytes, FakeLambdaError>;

/// Path of the ListFunctions operation.
pub const LIST_FUNCTIONS_PATH: &str = "/2015-03-31/functions";

/// Request bodies above this size are rejected with 413 before routing.
pub const MAX_REQUEST_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Body of a ListFunctions response.
///
/// `NextMarker` is always serialized as `null`: every function is returned in
/// a single page.
#[derive(Serialize)]
struct ListFunctionsResponse {
    #[serde(rename = "Functions")]
    functions: Vec<FunctionDescriptor>,
    #[serde(rename = "NextMarker")]
    next_marker: Option<String>,
}

/// Pagination parameters a client may send with ListFunctions. They are
/// accepted but not applied.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListFunctionsParams {
    pub marker: Option<String>,
    pub max_items: Option<String>,
}

impl ListFunctionsParams {
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = ListFunctionsParams::default();
        let Some(query) = query else {
            return params;
        };

        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                "Marker" => params.marker = Some(value.into_owned()),
                "MaxItems" => params.max_items = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

/// Serves ListFunctions from a registry. Every other request gets a 500.
#[derive(Clone)]
pub struct Dispatcher {
    registry: FunctionRegistry,
}

impl Dispatcher {
    pub fn new(registry: FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Handles one request. The body is collected in full, up to
    /// [`MAX_REQUEST_BODY_BYTES`], before routing.
    pub async fn dispatch<B>(&self, req: Request<B>) -> Result<Response<LambdaBody>>
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        if let Err(e) = Limited::new(body, MAX_REQUEST_BODY_BYTES).collect().await {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                tracing::warn!(method = %parts.method, uri = %parts.uri, "Request body too large");
                return Ok(make_text_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("Request body exceeds {MAX_REQUEST_BODY_BYTES} bytes"),
                ));
            }
            return Err(FakeLambdaError::RequestBodyError(e.to_string()));
        }

        if is_list_functions(&parts.method, parts.uri.path()) {
            let authorization = parts.headers.get(AUTHORIZATION).map(|v| v.as_bytes());
            self.list_functions(authorization, parts.uri.query())
        } else {
            Ok(self.unsupported(&parts.method, &parts.uri))
        }
    }

    fn list_functions(
        &self,
        authorization: Option<&[u8]>,
        query: Option<&str>,
    ) -> Result<Response<LambdaBody>> {
        let tenant = identity::resolve(authorization);
        let params = ListFunctionsParams::from_query(query);
        let functions = self.registry.lookup_tenant(&tenant);

        counter!(LIST_FUNCTIONS_REQUESTS).increment(1);
        tracing::debug!(
            %tenant,
            marker = ?params.marker,
            max_items = ?params.max_items,
            functions = functions.len(),
            "Listing functions"
        );

        let body = serde_json::to_vec(&ListFunctionsResponse {
            functions,
            next_marker: None,
        })?;

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)).map_err(|e| match e {}).boxed())?)
    }

    fn unsupported(&self, method: &Method, uri: &Uri) -> Response<LambdaBody> {
        counter!(UNSUPPORTED_REQUESTS).increment(1);
        tracing::warn!(%method, %uri, "Unsupported request");

        make_text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("URL not supported: {uri}"),
        )
    }
}

fn is_list_functions(method: &Method, path: &str) -> bool {
    *method == Method::GET
        && path
            .strip_prefix(LIST_FUNCTIONS_PATH)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

impl Service<Request<Incoming>> for Dispatcher {
    type Response = Response<LambdaBody>;
    type Error = FakeLambdaError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { dispatcher.dispatch(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Empty;
    use serde_json::{Value, json};

    const AUTHORIZATION_123: &str = "AWS4-HMAC-SHA256 Credential=123/20240101/us-east-1/lambda/aws4_request, SignedHeaders=host, Signature=abc";

    fn test_request(method: Method, uri: &str, authorization: Option<&str>) -> Request<Empty<Bytes>> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Empty::new()).unwrap()
    }

    async fn body_bytes(response: Response<LambdaBody>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    async fn json_body(dispatcher: &Dispatcher, req: Request<Empty<Bytes>>) -> Value {
        let response = dispatcher.dispatch(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_list_functions_empty() {
        let dispatcher = Dispatcher::new(FunctionRegistry::new());
        let req = test_request(Method::GET, "/2015-03-31/functions/", Some(AUTHORIZATION_123));

        let response = dispatcher.dispatch(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            body_bytes(response).await,
            r#"{"Functions":[],"NextMarker":null}"#
        );
    }

    #[tokio::test]
    async fn test_list_functions_for_tenant() {
        let registry = FunctionRegistry::new();
        registry.populate(
            "123",
            "us-east-1",
            vec![json!({"FunctionName": "account"}), json!({"FunctionName": "contact"})],
        );
        registry.populate("456", "us-east-1", vec![json!({"FunctionName": "other"})]);
        let dispatcher = Dispatcher::new(registry);

        let req = test_request(Method::GET, "/2015-03-31/functions/", Some(AUTHORIZATION_123));
        let body = json_body(&dispatcher, req).await;

        assert_eq!(
            body,
            json!({
                "Functions": [{"FunctionName": "account"}, {"FunctionName": "contact"}],
                "NextMarker": null,
            })
        );
    }

    #[tokio::test]
    async fn test_unresolved_identity_uses_default_tenant() {
        let registry = FunctionRegistry::new();
        registry.populate("default", "us-east-1", vec![json!({"FunctionName": "fallback"})]);
        let dispatcher = Dispatcher::new(registry);

        for authorization in [None, Some("Bearer token"), Some(AUTHORIZATION_123)] {
            let req = test_request(Method::GET, "/2015-03-31/functions", authorization);
            let body = json_body(&dispatcher, req).await;
            assert_eq!(body["Functions"], json!([{"FunctionName": "fallback"}]));
        }
    }

    #[tokio::test]
    async fn test_pagination_is_ignored() {
        let registry = FunctionRegistry::new();
        registry.populate(
            "123",
            "us-east-1",
            vec![json!({"FunctionName": "a"}), json!({"FunctionName": "b"})],
        );
        let dispatcher = Dispatcher::new(registry);

        let req = test_request(
            Method::GET,
            "/2015-03-31/functions/?Marker=abc&MaxItems=1",
            Some(AUTHORIZATION_123),
        );
        let body = json_body(&dispatcher, req).await;
        assert_eq!(body["Functions"].as_array().unwrap().len(), 2);
        assert_eq!(body["NextMarker"], Value::Null);
    }

    #[tokio::test]
    async fn test_unsupported_requests() {
        let dispatcher = Dispatcher::new(FunctionRegistry::new());

        for (method, uri) in [
            (Method::POST, "/2015-03-31/functions/"),
            (Method::DELETE, "/2015-03-31/functions/account"),
            (Method::GET, "/2015-03-31/functionsx"),
            (Method::GET, "/2018-10-31/layers/"),
            (Method::GET, "/"),
        ] {
            let req = test_request(method, uri, Some(AUTHORIZATION_123));
            let response = dispatcher.dispatch(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                body_bytes(response).await,
                format!("URL not supported: {uri}")
            );
        }
    }

    #[tokio::test]
    async fn test_body_is_consumed_before_routing() {
        let dispatcher = Dispatcher::new(FunctionRegistry::new());
        let req = Request::builder()
            .method(Method::GET)
            .uri("/2015-03-31/functions/")
            .body(Full::new(Bytes::from_static(b"ignored body")))
            .unwrap();

        let response = dispatcher.dispatch(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let registry = FunctionRegistry::new();
        registry.populate("123", "us-east-1", vec![json!({"FunctionName": "account"})]);
        let dispatcher = Dispatcher::new(registry);
        let req = Request::builder()
            .method(Method::GET)
            .uri("/2015-03-31/functions/")
            .header(AUTHORIZATION, AUTHORIZATION_123)
            .body(Full::new(Bytes::from(vec![b'x'; MAX_REQUEST_BODY_BYTES + 1])))
            .unwrap();

        let response = dispatcher.dispatch(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // A body right at the limit is still accepted
        let req = Request::builder()
            .method(Method::GET)
            .uri("/2015-03-31/functions/")
            .header(AUTHORIZATION, AUTHORIZATION_123)
            .body(Full::new(Bytes::from(vec![b'x'; MAX_REQUEST_BODY_BYTES])))
            .unwrap();
        let response = dispatcher.dispatch(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["Functions"], json!([{"FunctionName": "account"}]));
    }

    #[test]
    fn test_list_functions_params() {
        assert_eq!(
            ListFunctionsParams::from_query(Some("Marker=next%2Fpage&MaxItems=50&FunctionVersion=ALL")),
            ListFunctionsParams {
                marker: Some("next/page".into()),
                max_items: Some("50".into()),
            }
        );
        assert_eq!(ListFunctionsParams::from_query(None), ListFunctionsParams::default());
    }
}

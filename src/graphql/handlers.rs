use async_graphql::http::GraphiQLSource;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{auth::Session, state::AppState};

/// POST /graphql
///
/// Attaches the caller's session cookie to the request and copies any `Set-Cookie` headers the
/// resolvers produced onto the HTTP response.
pub async fn graphql_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<async_graphql::Request>,
) -> Response {
    let session = Session::from_jar(&jar, state.cookies.name());
    let response = state.schema.execute(request.data(session)).await;

    let mut headers = HeaderMap::new();
    for (name, value) in response.http_headers.iter() {
        headers.append(name.clone(), value.clone());
    }
    (headers, Json(response)).into_response()
}

/// GET /graphql
pub async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

//! JSON responder that leaves out null-valued properties.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

/// JSON response whose null-valued object properties are omitted.
///
/// Use it where `axum::Json` would be used. `None` fields disappear from the
/// output instead of being written as `null`, at every nesting level. Null
/// array elements are kept since they are positions, not properties.
///
/// # Example
///
/// ```rust
/// use pipeline_defaults::DefaultJson;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User {
///     id: u32,
///     email: Option<String>,
/// }
///
/// async fn get_user() -> DefaultJson<User> {
///     DefaultJson(User { id: 7, email: None }) // serialized as {"id":7}
/// }
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultJson<T>(pub T);

impl<T> From<T> for DefaultJson<T> {
    fn from(inner: T) -> Self {
        Self(inner)
    }
}

impl<T: Serialize> IntoResponse for DefaultJson<T> {
    fn into_response(self) -> Response {
        match to_vec(&self.0) {
            Ok(bytes) => (
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                )],
                bytes,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize JSON response");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("text/plain; charset=utf-8"),
                    )],
                    e.to_string(),
                )
                    .into_response()
            }
        }
    }
}

/// Serialize `value` to a JSON value with null properties removed.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(value)?;
    omit_nulls(&mut value);
    Ok(value)
}

/// Serialize `value` to JSON bytes with null properties removed.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&to_value(value)?)
}

/// Remove null-valued properties from every object inside `value`.
pub fn omit_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(omit_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(omit_nulls),
        _ => {}
    }
}

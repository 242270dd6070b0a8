/// Liveness probe. Never touches the tool or the admission controller.
///
/// `GET /` (and `HEAD /`)
pub async fn health() -> &'static str {
    "OK"
}

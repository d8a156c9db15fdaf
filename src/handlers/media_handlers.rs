//! Serves stored images at their public URL.

use crate::{
    errors::AppError,
    models::{
        bucket::{Bucket, UnknownBucket},
        object::ObjectEntry,
    },
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use chrono::{DateTime, Utc};
use tokio_util::io::ReaderStream;

/// `GET /media/{bucket}/{*key}`: streams the object body.
pub async fn get_media(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let bucket: Bucket = bucket
        .parse()
        .map_err(|err: UnknownBucket| AppError::not_found(err.to_string()))?;
    let (entry, file) = state.storage.open(bucket, &key).await?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &entry);
    Ok(response)
}

fn set_object_headers(headers: &mut HeaderMap, entry: &ObjectEntry) {
    let content_type = entry
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".into());
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(entry.size_bytes.max(0) as u64),
    );

    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", entry.etag)) {
        headers.insert(header::ETAG, value);
    }

    if let Ok(value) = HeaderValue::from_str(&http_date(&entry.last_modified)) {
        headers.insert(header::LAST_MODIFIED, value);
    }

    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );
}

/// IMF-fixdate, as `Last-Modified` expects.
fn http_date(at: &DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn last_modified_uses_gmt_fixdate() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(http_date(&at), "Tue, 05 Mar 2024 07:08:09 GMT");
    }

    #[test]
    fn object_headers_are_set_from_metadata() {
        let entry = ObjectEntry {
            bucket: "project-images".into(),
            key: "1700000000000.png".into(),
            content_type: Some("image/webp".into()),
            size_bytes: 42,
            etag: "abc123".into(),
            last_modified: Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap(),
        };
        let mut headers = HeaderMap::new();
        set_object_headers(&mut headers, &entry);

        assert_eq!(headers[header::CONTENT_TYPE], "image/webp");
        assert_eq!(headers[header::CONTENT_LENGTH], "42");
        assert_eq!(headers[header::ETAG], "\"abc123\"");
        assert_eq!(headers[header::LAST_MODIFIED], "Tue, 05 Mar 2024 07:08:09 GMT");
    }
}

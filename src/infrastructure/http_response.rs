// HTTP response utilities for mesh downloads with optional Brotli encoding
use async_compression::tokio::bufread::BrotliEncoder;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Response, StatusCode, header},
};
use bytes::Bytes;
use tokio::io::AsyncReadExt;

/// True when the client lists `br` in `Accept-Encoding`.
pub fn accepts_brotli(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|encoding| {
            let name = encoding.split(';').next().unwrap_or_default().trim();
            name.eq_ignore_ascii_case("br")
        })
}

pub async fn brotli_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = BrotliEncoder::new(data);
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed).await?;
    Ok(compressed)
}

/// `attachment` disposition with a plain and an RFC 5987 encoded filename.
fn content_disposition(filename: &str) -> String {
    let plain: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        plain,
        urlencoding::encode(filename)
    )
}

/// Serve a mesh file as an attachment, Brotli-compressed when `compress` is set.
pub async fn mesh_response(
    bytes: Bytes,
    filename: &str,
    content_type: &'static str,
    compress: bool,
) -> Result<Response<Body>, StatusCode> {
    let (body, content_encoding) = if compress {
        let compressed = brotli_compress(&bytes).await.map_err(|e| {
            tracing::error!(error = %e, "Brotli compression failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        tracing::debug!(
            raw = bytes.len(),
            compressed = compressed.len(),
            "Compressed mesh with Brotli"
        );
        (Bytes::from(compressed), Some("br"))
    } else {
        (bytes, None)
    };

    let disposition = HeaderValue::from_str(&content_disposition(filename)).map_err(|e| {
        tracing::error!(error = %e, filename, "Invalid Content-Disposition");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, body.len())
        .header(header::VARY, "accept-encoding");

    if let Some(encoding) = content_encoding {
        builder = builder.header(header::CONTENT_ENCODING, encoding);
    }

    builder.body(Body::from(body)).map_err(|e| {
        tracing::error!(error = %e, "Response build error");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

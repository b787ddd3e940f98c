use std::convert::Infallible;

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::stream;
use multer::{Constraints, Multipart, SizeLimit};

use super::domain::{Attachment, IngestedForm};

/// Part metadata defaults applied when a part omits its own headers.
const DEFAULT_PART_MIME_TYPE: &str = "text/plain";
const DEFAULT_PART_ENCODING: &str = "7bit";

/// Transport encoding of the request body as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    #[default]
    Identity,
    Base64,
}

impl BodyEncoding {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let declared = headers
            .get("content-transfer-encoding")
            .and_then(|value| value.to_str().ok())
            .map(str::trim);
        match declared {
            Some(value) if value.eq_ignore_ascii_case("base64") => Self::Base64,
            _ => Self::Identity,
        }
    }
}

/// Raw submission as received: declared content type plus the encoded body.
#[derive(Debug, Clone)]
pub struct SubmissionPayload {
    pub content_type: String,
    pub body: Bytes,
    pub encoding: BodyEncoding,
}

impl SubmissionPayload {
    pub fn from_parts(headers: &HeaderMap, body: Bytes) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Self {
            content_type,
            body,
            encoding: BodyEncoding::from_headers(headers),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unable to read request body: {0}")]
    Body(String),
    #[error("request body is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("request body exceeds the {limit} byte submission limit")]
    TooLarge { limit: u64 },
    #[error("malformed multipart body: {0}")]
    Multipart(String),
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
}

impl From<multer::Error> for ParseError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit } => ParseError::TooLarge { limit },
            other => ParseError::Multipart(other.to_string()),
        }
    }
}

/// Decodes a multipart submission into text fields and buffered attachments.
#[derive(Debug, Clone)]
pub struct FormIngestor {
    max_body_bytes: usize,
}

impl FormIngestor {
    pub fn new(max_body_bytes: usize) -> Self {
        Self { max_body_bytes }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Drains the whole body before returning; nothing is yielded for a body that
    /// fails partway through.
    pub async fn ingest(&self, payload: SubmissionPayload) -> Result<IngestedForm, ParseError> {
        let SubmissionPayload {
            content_type,
            body,
            encoding,
        } = payload;

        let body = self.decode(body, encoding)?;
        let boundary = multer::parse_boundary(&content_type)?;
        let constraints = Constraints::new()
            .size_limit(SizeLimit::new().whole_stream(self.max_body_bytes as u64));
        let stream = stream::once(async move { Ok::<_, Infallible>(body) });
        let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

        let mut form = IngestedForm::default();

        while let Some(mut field) = multipart.next_field().await? {
            let field_name = field.name().unwrap_or_default().to_string();

            let Some(filename) = field.file_name().map(str::to_string) else {
                let value = field.text().await?;
                form.fields.insert(field_name, value);
                continue;
            };

            let mime_type = field
                .content_type()
                .map(|mime| mime.to_string())
                .unwrap_or_else(|| DEFAULT_PART_MIME_TYPE.to_string());
            let encoding = field
                .headers()
                .get("content-transfer-encoding")
                .and_then(|value| value.to_str().ok())
                .unwrap_or(DEFAULT_PART_ENCODING)
                .to_string();

            let mut content = Vec::new();
            while let Some(chunk) = field.chunk().await? {
                content.extend_from_slice(&chunk);
            }

            form.files.push(Attachment {
                field_name,
                filename,
                mime_type,
                encoding,
                content,
            });
        }

        Ok(form)
    }

    fn decode(&self, body: Bytes, encoding: BodyEncoding) -> Result<Bytes, ParseError> {
        let decoded = match encoding {
            BodyEncoding::Identity => body,
            BodyEncoding::Base64 => {
                let trimmed: Vec<u8> = body
                    .iter()
                    .copied()
                    .filter(|byte| !byte.is_ascii_whitespace())
                    .collect();
                Bytes::from(STANDARD.decode(trimmed)?)
            }
        };

        if decoded.len() > self.max_body_bytes {
            return Err(ParseError::TooLarge {
                limit: self.max_body_bytes as u64,
            });
        }
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const BOUNDARY: &str = "X-INTAKE-BOUNDARY";

    fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn raw_payload(body: String) -> SubmissionPayload {
        SubmissionPayload {
            content_type: content_type(),
            body: Bytes::from(body),
            encoding: BodyEncoding::Identity,
        }
    }

    #[tokio::test]
    async fn decodes_base64_bodies_into_fields_and_files() {
        let body = format!(
            "{}{}--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"resume.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4 body\r\n--{BOUNDARY}--\r\n",
            text_part("uniqueIdentifier", "abc123"),
            text_part("지원자명", "Kim"),
        );
        let payload = SubmissionPayload {
            content_type: content_type(),
            body: Bytes::from(STANDARD.encode(body)),
            encoding: BodyEncoding::Base64,
        };

        let form = FormIngestor::new(1024 * 1024)
            .ingest(payload)
            .await
            .expect("ingests");

        assert_eq!(form.fields.get("uniqueIdentifier"), Some("abc123"));
        assert_eq!(form.fields.get("지원자명"), Some("Kim"));
        assert_eq!(form.files.len(), 1);
        let file = &form.files[0];
        assert_eq!(file.field_name, "resume");
        assert_eq!(file.filename, "resume.pdf");
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(file.encoding, "7bit");
        assert_eq!(file.content, b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn file_parts_without_content_type_default_to_text_plain() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"notes\"; filename=\"notes.txt\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
        );

        let form = FormIngestor::new(1024)
            .ingest(raw_payload(body))
            .await
            .expect("ingests");

        assert_eq!(form.files[0].mime_type, "text/plain");
        assert!(form.fields.is_empty());
    }

    #[tokio::test]
    async fn later_duplicate_fields_win() {
        let body = format!(
            "{}{}{}--{BOUNDARY}--\r\n",
            text_part("extra", "first"),
            text_part("other", "x"),
            text_part("extra", "second"),
        );

        let form = FormIngestor::new(1024)
            .ingest(raw_payload(body))
            .await
            .expect("ingests");

        assert_eq!(form.fields.get("extra"), Some("second"));
        assert_eq!(form.fields.iter().next().map(|f| f.key.as_str()), Some("extra"));
    }

    #[tokio::test]
    async fn files_keep_stream_order() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"a\"; filename=\"first.txt\"\r\n\r\n1\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"b\"; filename=\"second.txt\"\r\n\r\n2\r\n--{BOUNDARY}--\r\n"
        );

        let form = FormIngestor::new(1024)
            .ingest(raw_payload(body))
            .await
            .expect("ingests");

        let names: Vec<&str> = form.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["first.txt", "second.txt"]);
    }

    #[tokio::test]
    async fn truncated_body_fails_whole_ingestion() {
        let body = format!(
            "{}--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"resume.pdf\"\r\n\r\nhalf a fi",
            text_part("uniqueIdentifier", "abc123"),
        );

        let err = FormIngestor::new(1024)
            .ingest(raw_payload(body))
            .await
            .expect_err("truncated stream must fail");

        assert!(matches!(err, ParseError::Multipart(_)));
    }

    #[tokio::test]
    async fn missing_boundary_is_a_parse_error() {
        let payload = SubmissionPayload {
            content_type: "application/json".to_string(),
            body: Bytes::from_static(b"{}"),
            encoding: BodyEncoding::Identity,
        };

        let err = FormIngestor::new(1024)
            .ingest(payload)
            .await
            .expect_err("not multipart");

        assert!(matches!(err, ParseError::Multipart(_)));
    }

    #[tokio::test]
    async fn invalid_base64_is_rejected() {
        let payload = SubmissionPayload {
            content_type: content_type(),
            body: Bytes::from_static(b"not*base64!"),
            encoding: BodyEncoding::Base64,
        };

        let err = FormIngestor::new(1024)
            .ingest(payload)
            .await
            .expect_err("invalid base64");

        assert!(matches!(err, ParseError::Encoding(_)));
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected_before_parsing() {
        let body = format!("{}--{BOUNDARY}--\r\n", text_part("extra", &"x".repeat(64)));

        let err = FormIngestor::new(32)
            .ingest(raw_payload(body))
            .await
            .expect_err("too large");

        assert!(matches!(err, ParseError::TooLarge { limit: 32 }));
    }

    #[test]
    fn transfer_encoding_header_selects_base64() {
        let mut headers = HeaderMap::new();
        assert_eq!(BodyEncoding::from_headers(&headers), BodyEncoding::Identity);
        headers.insert(
            "content-transfer-encoding",
            HeaderValue::from_static("BASE64"),
        );
        assert_eq!(BodyEncoding::from_headers(&headers), BodyEncoding::Base64);
    }
}

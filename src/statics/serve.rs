//! Serving one file from a static root.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use crate::config::FileServeMode;
use crate::error::{WireError, WireResult};
use crate::http::date::{format_last_modified, parse_http_date, unix_seconds};
use crate::http::response::ResponseSink;
use crate::observability::metrics;
use crate::statics::map::StaticRoot;

/// Per-request inputs to [`serve_file`].
#[derive(Debug, Clone, Copy)]
pub struct ServeContext<'a> {
    /// Status line protocol, e.g. `HTTP/1.1`.
    pub protocol: &'a [u8],
    /// Raw `If-Modified-Since` value, when the request carried one.
    pub if_modified_since: Option<&'a [u8]>,
    pub mode: FileServeMode,
    /// Header lines echoed verbatim (without CRLF).
    pub additional_headers: &'a [String],
}

/// What [`serve_file`] did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// 200 written, with the body streamed or delegated to the front end.
    Served { headers_size: usize, body_size: u64 },
    /// 304 written, no body.
    NotModified { headers_size: usize },
    /// Nothing written; the request continues down the pipeline.
    NotFound,
}

impl ServeOutcome {
    /// True when a response was produced and the request is finished.
    pub fn is_handled(&self) -> bool {
        !matches!(self, ServeOutcome::NotFound)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ServeOutcome::Served { .. } => Some(200),
            ServeOutcome::NotModified { .. } => Some(304),
            ServeOutcome::NotFound => None,
        }
    }
}

fn push_status(out: &mut Vec<u8>, protocol: &[u8], status: &[u8]) {
    out.extend_from_slice(protocol);
    out.extend_from_slice(status);
}

fn push_additional(out: &mut Vec<u8>, headers: &[String]) {
    for header in headers {
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
}

fn push_redirect(out: &mut Vec<u8>, name: &[u8], orig_root: &[u8], path_info: &[u8]) {
    out.extend_from_slice(name);
    out.extend_from_slice(orig_root);
    if !orig_root.ends_with(b"/") {
        out.push(b'/');
    }
    out.extend_from_slice(path_info);
    out.extend_from_slice(b"\r\n");
}

/// Serves `root/path_info` into `sink`.
///
/// The joined path is canonicalized and must stay under the canonical root;
/// anything else is a [`WireError::SecurityError`] and the file is not opened.
/// Paths that do not resolve, or resolve to something other than a regular
/// file, are [`ServeOutcome::NotFound`].
pub async fn serve_file<S: ResponseSink>(
    sink: &mut S,
    ctx: &ServeContext<'_>,
    root: &StaticRoot,
    path_info: &[u8],
) -> WireResult<ServeOutcome> {
    let mut joined = Vec::with_capacity(root.document_root_bytes().len() + 1 + path_info.len());
    joined.extend_from_slice(root.document_root_bytes());
    joined.push(b'/');
    joined.extend_from_slice(path_info);
    let filename = PathBuf::from(OsStr::from_bytes(&joined));

    tracing::trace!(path = %filename.display(), "checking for static file");

    let real = match tokio::fs::canonicalize(&filename).await {
        Ok(real) => real,
        Err(e) => {
            tracing::trace!(path = %filename.display(), error = %e, "unable to resolve static file");
            return Ok(ServeOutcome::NotFound);
        }
    };

    if !real.starts_with(root.document_root()) {
        tracing::warn!(
            path = %real.display(),
            root = %root.document_root().display(),
            "security error: static file is not under its document root"
        );
        metrics::record_static("security_error");
        return Err(WireError::SecurityError {
            path: real.display().to_string(),
            root: root.document_root().display().to_string(),
        });
    }

    let meta = match tokio::fs::metadata(&real).await {
        Ok(meta) => meta,
        Err(_) => return Ok(ServeOutcome::NotFound),
    };
    let mtime = meta.modified().map(unix_seconds).unwrap_or(0);

    if let Some(ims) = ctx.if_modified_since.and_then(parse_http_date) {
        if mtime <= ims {
            let mut head = Vec::new();
            push_status(&mut head, ctx.protocol, b" 304 Not Modified\r\n");
            push_additional(&mut head, ctx.additional_headers);
            head.extend_from_slice(b"\r\n");
            let headers_size = sink.write_header(&head).await?;
            metrics::record_static("not_modified");
            return Ok(ServeOutcome::NotModified { headers_size });
        }
    }

    if !meta.is_file() {
        return Ok(ServeOutcome::NotFound);
    }

    tracing::debug!(path = %real.display(), mode = ?ctx.mode, "static file found");

    let mut head = Vec::new();
    push_status(&mut head, ctx.protocol, b" 200 OK\r\n");
    push_additional(&mut head, ctx.additional_headers);
    match ctx.mode {
        FileServeMode::XAccelRedirect => {
            push_redirect(&mut head, b"X-Accel-Redirect: ", &root.orig_document_root, path_info);
        }
        FileServeMode::XSendfile => {
            push_redirect(&mut head, b"X-Sendfile: ", &root.orig_document_root, path_info);
        }
        FileServeMode::Passthrough => {}
    }
    head.extend_from_slice(format_last_modified(mtime).as_bytes());

    let headers_size = sink.write_header(&head).await?;
    let body_size = match ctx.mode {
        FileServeMode::Passthrough => {
            let mut file = tokio::fs::File::open(&real).await?;
            sink.send_file(&mut file, meta.len()).await?
        }
        _ => 0,
    };

    metrics::record_static("served");
    Ok(ServeOutcome::Served {
        headers_size,
        body_size,
    })
}

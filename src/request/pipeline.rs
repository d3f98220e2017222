//! Per-request processing after the frame has been read.
//!
//! # Data Flow
//! ```text
//! payload
//!     → VarTable::build (decode, bind, capacity, limits, setenv)
//!     → body buffering (memory or temp file)
//!     → cache short-circuit (UWSGI_CACHE_GET, then GET by REQUEST_URI)
//!     → SCRIPT_NAME / PATH_INFO split on the longest mountpoint
//!     → static short-circuit (check-static root, then static maps)
//!     → application
//! ```

use std::sync::Arc;

use tokio::io::AsyncRead;

use crate::cache::ResponseCache;
use crate::config::GatewayConfig;
use crate::env::EnvironmentSink;
use crate::error::{WireError, WireResult};
use crate::http::response::ResponseSink;
use crate::observability::metrics;
use crate::request::body::{read_body, BodyOptions, RequestBody};
use crate::request::mount::MountTable;
use crate::request::vars::{BuildOptions, VarTable};
use crate::statics::{serve_file, ServeContext, ServeOutcome, StaticMapTable, StaticRoot};

const DEFAULT_PROTOCOL: &[u8] = b"HTTP/1.1";

/// Where a request ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Nothing answered it yet; run the application.
    Application,
    /// Answered from the cache.
    Cached { response_size: usize },
    /// Answered with a static file (200) or a 304.
    Static {
        status: u16,
        headers_size: usize,
        body_size: u64,
    },
}

impl Disposition {
    /// True when a response was already written.
    pub fn is_complete(&self) -> bool {
        !matches!(self, Disposition::Application)
    }
}

/// A decoded request.
#[derive(Debug)]
pub struct Request<'a> {
    pub vars: VarTable<'a>,
    pub body: Option<RequestBody>,
    pub disposition: Disposition,
}

/// Read-only per-process state used to process requests.
pub struct RequestPipeline {
    config: Arc<GatewayConfig>,
    build: BuildOptions,
    body: BodyOptions,
    statics: StaticMapTable,
    mounts: MountTable,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("build", &self.build)
            .field("statics", &self.statics)
            .field("mounts", &self.mounts)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl RequestPipeline {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self {
            build: BuildOptions::from_config(&config),
            body: BodyOptions::from_config(&config),
            statics: StaticMapTable::from_config(&config),
            mounts: MountTable::from_config(&config),
            cache: None,
            config,
        }
    }

    /// Attaches the cache consulted for short-circuit responses.
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn statics(&self) -> &StaticMapTable {
        &self.statics
    }

    /// Processes one request payload.
    ///
    /// `conn` supplies the body when buffering is enabled; `sink` receives
    /// cached and static responses. Errors abort this request only.
    pub async fn process<'a, C, S, E>(
        &'a self,
        payload: &'a [u8],
        conn: &mut C,
        sink: &mut S,
        env: &mut E,
    ) -> WireResult<Request<'a>>
    where
        C: AsyncRead + Unpin,
        S: ResponseSink,
        E: EnvironmentSink + ?Sized,
    {
        let mut vars = VarTable::build(payload, &self.build, env).inspect_err(|e| {
            metrics::record_rejected(e.kind());
        })?;

        let body = self.buffer_body(&vars, conn).await?;

        if let Some(response_size) = self.try_cache(&vars, sink).await? {
            return Ok(Request {
                vars,
                body,
                disposition: Disposition::Cached { response_size },
            });
        }

        self.manage_script_name(&mut vars)?;

        let disposition = match self.try_static(&vars, sink).await? {
            Some(ServeOutcome::Served {
                headers_size,
                body_size,
            }) => Disposition::Static {
                status: 200,
                headers_size,
                body_size,
            },
            Some(ServeOutcome::NotModified { headers_size }) => Disposition::Static {
                status: 304,
                headers_size,
                body_size: 0,
            },
            Some(ServeOutcome::NotFound) | None => Disposition::Application,
        };

        Ok(Request {
            vars,
            body,
            disposition,
        })
    }

    async fn buffer_body<C>(&self, vars: &VarTable<'_>, conn: &mut C) -> WireResult<Option<RequestBody>>
    where
        C: AsyncRead + Unpin,
    {
        let post_cl = vars.vars().post_cl;
        if !self.body.enabled() || post_cl == 0 {
            return Ok(None);
        }
        let body = read_body(conn, post_cl, &self.body).await.inspect_err(|e| {
            tracing::warn!(error = %e, content_length = post_cl, "unable to read request body");
            metrics::record_rejected(e.kind());
        })?;
        Ok(Some(body))
    }

    async fn try_cache<S: ResponseSink>(&self, vars: &VarTable<'_>, sink: &mut S) -> WireResult<Option<usize>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let fields = vars.vars();

        if let Some(key) = fields.cache_get.filter(|k| !k.is_empty()) {
            if let Some(value) = cache.get(key).filter(|v| !v.is_empty()) {
                metrics::record_cache_hit("cache_get");
                return Ok(Some(sink.write_body(&value).await?));
            }
        }

        if self.config.cache.check_cache && fields.method == Some(b"GET".as_slice()) {
            if let Some(uri) = fields.uri.filter(|u| !u.is_empty()) {
                if let Some(value) = cache.get(uri).filter(|v| !v.is_empty()) {
                    metrics::record_cache_hit("check_cache");
                    return Ok(Some(sink.write_body(&value).await?));
                }
            }
        }

        Ok(None)
    }

    fn manage_script_name<'a>(&'a self, vars: &mut VarTable<'a>) -> WireResult<()> {
        if !self.config.vars.manage_script_name || self.mounts.is_empty() {
            return Ok(());
        }
        let Some(path_info) = vars.vars().path_info.filter(|p| p.len() > 1) else {
            return Ok(());
        };
        match self.mounts.longest_match(path_info) {
            Some(mountpoint) => vars.rewrite_script_name(mountpoint).inspect_err(|e| {
                metrics::record_rejected(e.kind());
            }),
            None => Ok(()),
        }
    }

    async fn try_static<S: ResponseSink>(
        &self,
        vars: &VarTable<'_>,
        sink: &mut S,
    ) -> WireResult<Option<ServeOutcome>> {
        if self.statics.is_empty() {
            return Ok(None);
        }
        let fields = vars.vars();
        let path_info = fields.path_info.unwrap_or_default();
        let ctx = ServeContext {
            protocol: fields.protocol.unwrap_or(DEFAULT_PROTOCOL),
            if_modified_since: fields.if_modified_since,
            mode: self.config.static_files.file_serve_mode,
            additional_headers: &self.config.static_files.additional_headers,
        };

        if let Some(root) = self.statics.check_static() {
            if path_info.len() > 1 {
                if let Some(outcome) = attempt(sink, &ctx, root, path_info).await? {
                    return Ok(Some(outcome));
                }
            }
        }

        for (map, rest) in self.statics.matching(path_info) {
            tracing::trace!(mountpoint = %String::from_utf8_lossy(&map.mountpoint), "checking static map");
            if let Some(outcome) = attempt(sink, &ctx, &map.root, rest).await? {
                return Ok(Some(outcome));
            }
        }

        Ok(None)
    }
}

/// One serve attempt; a path escaping its root counts as a miss.
async fn attempt<S: ResponseSink>(
    sink: &mut S,
    ctx: &ServeContext<'_>,
    root: &StaticRoot,
    path_info: &[u8],
) -> WireResult<Option<ServeOutcome>> {
    match serve_file(sink, ctx, root, path_info).await {
        Ok(outcome) if outcome.is_handled() => Ok(Some(outcome)),
        Ok(_) => Ok(None),
        Err(WireError::SecurityError { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

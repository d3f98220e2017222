//! Well-known request variable names.

/// Variables the request table indexes by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownKey {
    ScriptName,
    PathInfo,
    ServerProtocol,
    RequestUri,
    QueryString,
    RequestMethod,
    RemoteAddr,
    RemoteUser,
    Scheme,
    Script,
    Module,
    Callable,
    Pyhome,
    Chdir,
    File,
    TouchReload,
    CacheGet,
    Setenv,
    ServerName,
    HttpHost,
    Https,
    IfModifiedSince,
    ContentLength,
}

impl WellKnownKey {
    /// Exact, case-sensitive lookup.
    pub fn from_bytes(key: &[u8]) -> Option<Self> {
        let key = match key {
            b"SCRIPT_NAME" => Self::ScriptName,
            b"PATH_INFO" => Self::PathInfo,
            b"SERVER_PROTOCOL" => Self::ServerProtocol,
            b"REQUEST_URI" => Self::RequestUri,
            b"QUERY_STRING" => Self::QueryString,
            b"REQUEST_METHOD" => Self::RequestMethod,
            b"REMOTE_ADDR" => Self::RemoteAddr,
            b"REMOTE_USER" => Self::RemoteUser,
            b"UWSGI_SCHEME" => Self::Scheme,
            b"UWSGI_SCRIPT" => Self::Script,
            b"UWSGI_MODULE" => Self::Module,
            b"UWSGI_CALLABLE" => Self::Callable,
            b"UWSGI_PYHOME" => Self::Pyhome,
            b"UWSGI_CHDIR" => Self::Chdir,
            b"UWSGI_FILE" => Self::File,
            b"UWSGI_TOUCH_RELOAD" => Self::TouchReload,
            b"UWSGI_CACHE_GET" => Self::CacheGet,
            b"UWSGI_SETENV" => Self::Setenv,
            b"SERVER_NAME" => Self::ServerName,
            b"HTTP_HOST" => Self::HttpHost,
            b"HTTPS" => Self::Https,
            b"HTTP_IF_MODIFIED_SINCE" => Self::IfModifiedSince,
            b"CONTENT_LENGTH" => Self::ContentLength,
            _ => return None,
        };
        Some(key)
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::ScriptName => b"SCRIPT_NAME",
            Self::PathInfo => b"PATH_INFO",
            Self::ServerProtocol => b"SERVER_PROTOCOL",
            Self::RequestUri => b"REQUEST_URI",
            Self::QueryString => b"QUERY_STRING",
            Self::RequestMethod => b"REQUEST_METHOD",
            Self::RemoteAddr => b"REMOTE_ADDR",
            Self::RemoteUser => b"REMOTE_USER",
            Self::Scheme => b"UWSGI_SCHEME",
            Self::Script => b"UWSGI_SCRIPT",
            Self::Module => b"UWSGI_MODULE",
            Self::Callable => b"UWSGI_CALLABLE",
            Self::Pyhome => b"UWSGI_PYHOME",
            Self::Chdir => b"UWSGI_CHDIR",
            Self::File => b"UWSGI_FILE",
            Self::TouchReload => b"UWSGI_TOUCH_RELOAD",
            Self::CacheGet => b"UWSGI_CACHE_GET",
            Self::Setenv => b"UWSGI_SETENV",
            Self::ServerName => b"SERVER_NAME",
            Self::HttpHost => b"HTTP_HOST",
            Self::Https => b"HTTPS",
            Self::IfModifiedSince => b"HTTP_IF_MODIFIED_SINCE",
            Self::ContentLength => b"CONTENT_LENGTH",
        }
    }
}

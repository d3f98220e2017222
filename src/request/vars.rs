//! Request variable table.
//!
//! Every decoded pair occupies two consecutive slots, key at `[2i]` and value
//! at `[2i + 1]`. Slots borrow from the receive buffer (or from the mount
//! table, for a rewritten SCRIPT_NAME); nothing is copied.

use crate::config::GatewayConfig;
use crate::env::EnvironmentSink;
use crate::error::{WireError, WireResult};
use crate::protocol::tlv::DictIter;
use crate::request::keys::WellKnownKey;

/// Settings read while building a table.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Total slots available (two per pair).
    pub max_slots: usize,
    /// CONTENT_LENGTH ceiling, 0 for none.
    pub limit_post: u64,
    /// Take the host from HTTP_HOST instead of SERVER_NAME.
    pub vhost_host: bool,
    /// Recognize UWSGI_CACHE_GET.
    pub cache_enabled: bool,
}

impl BuildOptions {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_slots: config.vars.max_slots,
            limit_post: config.limits.limit_post,
            vhost_host: config.vars.vhost_host,
            cache_enabled: config.cache.enabled,
        }
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

/// Well-known fields bound while decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestVars<'a> {
    pub script_name: Option<&'a [u8]>,
    pub path_info: Option<&'a [u8]>,
    pub protocol: Option<&'a [u8]>,
    pub uri: Option<&'a [u8]>,
    pub query_string: Option<&'a [u8]>,
    pub method: Option<&'a [u8]>,
    pub remote_addr: Option<&'a [u8]>,
    pub remote_user: Option<&'a [u8]>,
    pub scheme: Option<&'a [u8]>,
    pub script: Option<&'a [u8]>,
    pub module: Option<&'a [u8]>,
    pub callable: Option<&'a [u8]>,
    pub pyhome: Option<&'a [u8]>,
    pub chdir: Option<&'a [u8]>,
    pub file: Option<&'a [u8]>,
    pub touch_reload: Option<&'a [u8]>,
    pub cache_get: Option<&'a [u8]>,
    pub host: Option<&'a [u8]>,
    pub https: Option<&'a [u8]>,
    pub if_modified_since: Option<&'a [u8]>,
    /// Declared body length (0 when absent).
    pub post_cl: u64,
}

/// Parses the leading run of ASCII digits; anything after it is ignored.
pub fn parse_content_length(value: &[u8]) -> u64 {
    value
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0u64, |acc, b| acc.saturating_mul(10).saturating_add(u64::from(b - b'0')))
}

/// Decoded request variables for one in-flight request.
#[derive(Debug, Clone)]
pub struct VarTable<'a> {
    slots: Vec<&'a [u8]>,
    capacity: usize,
    vars: RequestVars<'a>,
    script_name_slot: Option<usize>,
    path_info_slot: Option<usize>,
}

impl<'a> VarTable<'a> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity.min(256)),
            capacity,
            vars: RequestVars::default(),
            script_name_slot: None,
            path_info_slot: None,
        }
    }

    /// Decodes a dictionary payload into a table.
    ///
    /// Any malformed pair, a CONTENT_LENGTH over the limit or running out of
    /// slots fails the whole request. UWSGI_SETENV assignments are handed to
    /// `env` as they are seen and are not undone on a later failure.
    pub fn build<E>(buffer: &'a [u8], opts: &BuildOptions, env: &mut E) -> WireResult<Self>
    where
        E: EnvironmentSink + ?Sized,
    {
        let mut table = Self::with_capacity(opts.max_slots);

        for pair in DictIter::new(buffer) {
            let (key, value) = pair.inspect_err(|e| {
                tracing::warn!(error = %e, "invalid uwsgi request, skipping");
            })?;
            table.bind(key, value, opts, env)?;
            table.push_pair(key, value)?;
        }

        Ok(table)
    }

    fn bind<E>(&mut self, key: &'a [u8], value: &'a [u8], opts: &BuildOptions, env: &mut E) -> WireResult<()>
    where
        E: EnvironmentSink + ?Sized,
    {
        let value_slot = self.slots.len() + 1;
        let vars = &mut self.vars;

        match WellKnownKey::from_bytes(key) {
            Some(WellKnownKey::ScriptName) => {
                vars.script_name = Some(value);
                self.script_name_slot = Some(value_slot);
            }
            Some(WellKnownKey::PathInfo) => {
                vars.path_info = Some(value);
                self.path_info_slot = Some(value_slot);
            }
            Some(WellKnownKey::ServerProtocol) => vars.protocol = Some(value),
            Some(WellKnownKey::RequestUri) => vars.uri = Some(value),
            Some(WellKnownKey::QueryString) => vars.query_string = Some(value),
            Some(WellKnownKey::RequestMethod) => vars.method = Some(value),
            Some(WellKnownKey::RemoteAddr) => vars.remote_addr = Some(value),
            Some(WellKnownKey::RemoteUser) => vars.remote_user = Some(value),
            Some(WellKnownKey::Scheme) => vars.scheme = Some(value),
            Some(WellKnownKey::Script) => vars.script = Some(value),
            Some(WellKnownKey::Module) => vars.module = Some(value),
            Some(WellKnownKey::Callable) => vars.callable = Some(value),
            Some(WellKnownKey::Pyhome) => vars.pyhome = Some(value),
            Some(WellKnownKey::Chdir) => vars.chdir = Some(value),
            Some(WellKnownKey::File) => vars.file = Some(value),
            Some(WellKnownKey::TouchReload) => vars.touch_reload = Some(value),
            Some(WellKnownKey::CacheGet) if opts.cache_enabled => vars.cache_get = Some(value),
            Some(WellKnownKey::Setenv) => apply_setenv(value, env),
            Some(WellKnownKey::ServerName) if !opts.vhost_host => vars.host = Some(value),
            Some(WellKnownKey::HttpHost) if opts.vhost_host => vars.host = Some(value),
            Some(WellKnownKey::Https) => vars.https = Some(value),
            Some(WellKnownKey::IfModifiedSince) => vars.if_modified_since = Some(value),
            Some(WellKnownKey::ContentLength) => {
                vars.post_cl = parse_content_length(value);
                if opts.limit_post > 0 && vars.post_cl > opts.limit_post {
                    tracing::warn!(
                        content_length = vars.post_cl,
                        limit = opts.limit_post,
                        "invalid (too big) CONTENT_LENGTH, skipping request"
                    );
                    return Err(WireError::BodyTooLarge {
                        size: vars.post_cl,
                        limit: opts.limit_post,
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn ensure_room(&self) -> WireResult<()> {
        if self.slots.len() + 2 > self.capacity {
            tracing::warn!(capacity = self.capacity, "max vec size reached, skipping request");
            return Err(WireError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn push_pair(&mut self, key: &'a [u8], value: &'a [u8]) -> WireResult<()> {
        self.ensure_room()?;
        self.slots.push(key);
        self.slots.push(value);
        Ok(())
    }

    /// Splits PATH_INFO at `mountpoint`, moving the prefix into SCRIPT_NAME.
    ///
    /// A SCRIPT_NAME pair is appended when the request had none. Does nothing
    /// without a PATH_INFO or when `mountpoint` does not prefix it.
    pub fn rewrite_script_name(&mut self, mountpoint: &'a [u8]) -> WireResult<()> {
        let (Some(path_slot), Some(path_info)) = (self.path_info_slot, self.vars.path_info) else {
            return Ok(());
        };
        let Some(rest) = path_info.strip_prefix(mountpoint) else {
            return Ok(());
        };

        let script_slot = match self.script_name_slot {
            Some(slot) => slot,
            None => {
                self.push_pair(WellKnownKey::ScriptName.as_bytes(), mountpoint)?;
                let slot = self.slots.len() - 1;
                self.script_name_slot = Some(slot);
                slot
            }
        };

        self.slots[script_slot] = mountpoint;
        self.slots[path_slot] = rest;
        self.vars.script_name = Some(mountpoint);
        self.vars.path_info = Some(rest);

        tracing::debug!(
            script_name = %String::from_utf8_lossy(mountpoint),
            path_info = %String::from_utf8_lossy(rest),
            "managed SCRIPT_NAME"
        );
        Ok(())
    }

    pub fn vars(&self) -> &RequestVars<'a> {
        &self.vars
    }

    /// Raw slots, key then value.
    pub fn slots(&self) -> &[&'a [u8]] {
        &self.slots
    }

    /// Number of key/value pairs.
    pub fn len(&self) -> usize {
        self.slots.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + '_ {
        self.slots.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Value of the last pair named `key`.
    pub fn get(&self, key: &[u8]) -> Option<&'a [u8]> {
        self.pairs().filter(|(k, _)| *k == key).last().map(|(_, v)| v)
    }
}

fn apply_setenv<E>(value: &[u8], env: &mut E)
where
    E: EnvironmentSink + ?Sized,
{
    let Some(eq) = value.iter().position(|b| *b == b'=') else {
        tracing::warn!(value = %String::from_utf8_lossy(value), "UWSGI_SETENV without '=', ignored");
        return;
    };
    let (name, rest) = value.split_at(eq);
    if let Err(e) = env.set_var(name, &rest[1..]) {
        tracing::error!(name = %String::from_utf8_lossy(name), error = %e, "setenv() failed");
    }
}

use url::Url;

/// Append `path` to the path already carried by `base`.
///
/// A leading segment of `path` that `base` already ends with is not repeated,
/// so `https://host/v1` + `/v1/models` yields `https://host/v1/models`.
pub(crate) fn build_provider_url(base: &Url, path: &str, query: Option<&str>) -> Url {
    let prefix = base.path().trim_end_matches('/');
    let mut suffix = path.trim_start_matches('/');

    if let Some((head, rest)) = suffix.split_once('/')
        && prefix.rsplit('/').next() == Some(head)
    {
        suffix = rest;
    }

    let mut url = base.clone();
    url.set_path(&format!("{prefix}/{suffix}"));
    url.set_query(query);
    url
}

#[derive(Debug, Clone)]
pub(crate) struct ProviderEndpoints {
    stream: Url,
    no_stream: Url,
}

impl ProviderEndpoints {
    pub(crate) fn new(
        base: &Url,
        stream_path: &str,
        stream_query: Option<&str>,
        no_stream_path: &str,
        no_stream_query: Option<&str>,
    ) -> Self {
        Self {
            stream: build_provider_url(base, stream_path, stream_query),
            no_stream: build_provider_url(base, no_stream_path, no_stream_query),
        }
    }

    /// Same URL regardless of streaming; the body carries the stream flag.
    pub(crate) fn single(base: &Url, path: &str) -> Self {
        let url = build_provider_url(base, path, None);
        Self {
            stream: url.clone(),
            no_stream: url,
        }
    }

    pub(crate) fn into_selected(self, stream: bool) -> Url {
        if stream { self.stream } else { self.no_stream }
    }
}

use indoc::formatdoc;
use pokeapi_client::CatalogClientError;
use pokedex_sdk::providers::cache::FetchError;

/// Join an error and its sources with `: `.
pub fn display_chain(mut err: &dyn std::error::Error) -> String {
    let mut fmt = err.to_string();
    while let Some(source) = err.source() {
        fmt = format!("{fmt}: {source}");
        err = source;
    }

    fmt
}

/// User facing description of a failed catalog request.
pub fn format_fetch_error(err: &FetchError) -> String {
    match err.inner() {
        CatalogClientError::NotFound { .. } | CatalogClientError::InvalidReference(_) => {
            err.to_string()
        },
        CatalogClientError::Transport { .. } => formatdoc! {"
            Could not reach the catalog.
            Check your network connection or the configured 'catalog_url'.

            {}", display_chain(err)},
        CatalogClientError::UnexpectedStatus { status, .. } if status.is_server_error() => {
            format!("The catalog is currently unavailable ({status}), try again later.")
        },
        CatalogClientError::MalformedResponse { .. } => formatdoc! {"
            The catalog sent a response that could not be understood.

            {}", display_chain(err)},
        _ => display_chain(err),
    }
}

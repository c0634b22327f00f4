use api_commands::{DeleteWordQuery, ListWordsQuery, WordQuery, WordRecord};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::instrument;

use super::WebState;
use crate::{
    error::LexiconResult,
    model::{LanguageCode, LanguageSelector, PageRequest, RelationSelection},
};

#[instrument(err, skip(state))]
pub async fn get_word(
    State(state): State<WebState>,
    Path(word): Path<String>,
    Query(query): Query<WordQuery>,
) -> LexiconResult<Response> {
    state.configuration.verify_word_length(&word)?;
    let source_language: LanguageSelector = query.sl.parse()?;
    let target_language: LanguageCode = query.tl.parse()?;

    Ok(
        match state
            .resolver
            .get(&word, &source_language, &target_language)
            .await?
        {
            Some(record) => Json(WordRecord::from(record)).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
    )
}

#[instrument(err, skip(state))]
pub async fn delete_word(
    State(state): State<WebState>,
    Path(word): Path<String>,
    Query(query): Query<DeleteWordQuery>,
) -> LexiconResult<StatusCode> {
    state.configuration.verify_word_length(&word)?;
    let source_language: LanguageSelector = query.sl.parse()?;

    state.resolver.delete(&word, &source_language).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(err, skip(state))]
pub async fn list_words(
    State(state): State<WebState>,
    Query(query): Query<ListWordsQuery>,
) -> LexiconResult<Json<Vec<WordRecord>>> {
    let page = PageRequest::new(query.page, query.page_size, &state.configuration)?;
    let word_filter = query
        .word_filter
        .as_deref()
        .filter(|word_filter| !word_filter.is_empty());

    let records = state
        .resolver
        .list_page(page, word_filter, RelationSelection::from(&query))
        .await?;
    Ok(Json(records.into_iter().map(WordRecord::from).collect()))
}

// File: src/handler.rs
// Purpose: Protocol state machine - interpreting one completed hybrid exchange

use std::sync::Arc;

use anyhow::Result;
use splice_protocol::{classify, ResponseKind, VisitPayload};

use crate::context::ContextPatch;
use crate::dispatch::HookPayload;
use crate::error::NavigationError;
use crate::history;
use crate::merge;
use crate::navigate::{
    dialog_from_payload, should_replace, HistoryWrite, NavigationKind, NavigationOptions,
    NavigationTarget,
};
use crate::request::{RawResponse, RequestDescriptor};
use crate::router::{RouterInner, VisitOutcome};
use crate::url::{fill_hash, make_url};

impl RouterInner {
    /// Entry point for the sequencer worker: interpret one settled exchange,
    /// drive the hooks, and always finish with the `after` hook. Protocol
    /// failures come back as a `Failed` outcome; only bugs in listener
    /// callbacks escape as an error.
    pub(crate) async fn process(
        &self,
        request: RequestDescriptor,
        response: RawResponse,
    ) -> Result<VisitOutcome> {
        let hooks = request.options.hooks.clone();

        let outcome = match self.interpret(&request, &response).await? {
            Ok(outcome) => Ok(outcome),
            Err(error) => self.run_failure_hooks(&request, error).await,
        };

        self.dispatch(HookPayload::After(request.intent()), &hooks).await?;
        outcome
    }

    /// Pre-network failure path (before-hook veto, abort, send error): same
    /// hook sequence as a processed response, without a response to carry.
    pub(crate) async fn settle_failure(
        &self,
        request: &RequestDescriptor,
        error: NavigationError,
    ) -> Result<VisitOutcome> {
        let outcome = self.run_failure_hooks(request, error).await;
        self.dispatch(HookPayload::After(request.intent()), &request.options.hooks)
            .await?;
        outcome
    }

    /// The branch ladder of §response handling, first match wins. The outer
    /// error channel carries listener bugs (propagated to the caller); the
    /// inner one carries protocol failures (mapped to hook invocations).
    async fn interpret(
        &self,
        request: &RequestDescriptor,
        response: &RawResponse,
    ) -> Result<std::result::Result<VisitOutcome, NavigationError>> {
        let hooks = &request.options.hooks;

        // Scroll capture comes before anything else, so a later back/forward
        // can land where the user left off. The amended slot write keeps the
        // CURRENT history entry in sync before any push replaces it.
        let captured = self.browser.capture_scroll();
        if let Err(error) = self
            .store
            .set(ContextPatch::new().scroll_regions(captured.clone()), false)
        {
            return Ok(Err(NavigationError::Other(error.into())));
        }
        match history::read(self.browser.as_ref(), self.serializer.as_ref()) {
            Ok(Some(mut saved)) => {
                saved.scroll_regions = captured;
                if let Ok(value) = self.serializer.serialize(&saved) {
                    if let Err(error) = self.browser.replace_state(&saved.url, value).await {
                        tracing::warn!(%error, "could not amend scroll into history slot");
                    }
                }
            }
            Ok(None) => {}
            Err(error) => {
                tracing::debug!(%error, "history slot unreadable; skipping scroll amend");
            }
        }

        // A data-hook veto stops everything with no context mutation.
        if !self.dispatch(HookPayload::Data(response.clone()), hooks).await? {
            tracing::debug!(url = %request.url, "data hook vetoed response application");
            return Ok(Ok(VisitOutcome::Completed {
                response: response.clone(),
            }));
        }

        match classify(&response.headers) {
            ResponseKind::External(location) => {
                let target = match make_url(&location, &request.url) {
                    Ok(url) => fill_hash(&request.url, &url),
                    Err(error) => return Ok(Err(NavigationError::Other(error))),
                };
                tracing::info!(url = %target, "external navigation requested by server");
                self.browser.load_external(&target);
                Ok(Ok(VisitOutcome::Completed {
                    response: response.clone(),
                }))
            }

            ResponseKind::Download => {
                tracing::info!(url = %request.url, "file download hand-off");
                self.browser.download(response);
                Ok(Ok(VisitOutcome::Completed {
                    response: response.clone(),
                }))
            }

            ResponseKind::NonHybrid => Ok(Err(NavigationError::NotHybrid(Box::new(
                response.clone(),
            )))),

            ResponseKind::Hybrid => self.apply_payload(request, response).await,
        }
    }

    /// Success branch: parse, merge when partial, navigate, then report
    /// either validation errors or success.
    async fn apply_payload(
        &self,
        request: &RequestDescriptor,
        response: &RawResponse,
    ) -> Result<std::result::Result<VisitOutcome, NavigationError>> {
        let hooks = &request.options.hooks;

        let payload: VisitPayload = match response.json() {
            Ok(payload) => payload,
            Err(error) => return Ok(Err(NavigationError::Other(error))),
        };

        let context = match self.store.get() {
            Ok(context) => context,
            Err(error) => return Ok(Err(NavigationError::Other(error.into()))),
        };

        // Partial requests merge onto the current properties when the payload
        // targets the same view (or omits the component, implying it).
        let is_partial = request.options.partial.is_partial();
        let same_component = payload
            .view
            .component
            .as_deref()
            .map(|component| component == context.view.component)
            .unwrap_or(true);
        let properties_override = if is_partial && same_component {
            Some(merge::merge_partial(
                &context.view.properties,
                &payload.view.properties,
                request.options.error_bag.as_deref(),
            ))
        } else {
            None
        };

        let incoming = match make_url(&payload.url, &request.url) {
            Ok(url) => fill_hash(&request.url, &url),
            Err(error) => return Ok(Err(NavigationError::Other(error))),
        };

        let dialog = match &payload.dialog {
            Some(dialog) => match dialog_from_payload(dialog, &incoming) {
                Ok(dialog) => Some(dialog),
                Err(error) => return Ok(Err(error)),
            },
            None => None,
        };

        let replace = should_replace(&request.options, &incoming, &self.browser.location());

        let navigation = NavigationOptions {
            kind: NavigationKind::Server,
            url: incoming,
            target: NavigationTarget {
                component: payload.view.component.clone(),
                properties: payload.view.properties.clone(),
                dialog,
                version: payload.version.clone(),
            },
            properties_override,
            preserve_scroll: request.options.preserve_scroll,
            preserve_state: request.options.preserve_state,
            preserve_url: request.options.preserve_url,
            history: if replace {
                HistoryWrite::Replace
            } else {
                HistoryWrite::Push
            },
            fresh: !is_partial,
            scroll_regions: None,
        };

        let details = match self.navigate(navigation).await {
            Ok(details) => details,
            Err(error) => return Ok(Err(error)),
        };
        self.dispatch(HookPayload::Navigate(details), hooks).await?;

        let applied = match self.store.get() {
            Ok(context) => context,
            Err(error) => return Ok(Err(NavigationError::Other(error.into()))),
        };
        let errors = merge::resolve_errors(
            &applied.view.properties,
            request.options.error_bag.as_deref(),
        );
        if merge::has_errors(&errors) {
            self.dispatch(HookPayload::Error(errors), hooks).await?;
        } else {
            self.dispatch(HookPayload::Success(payload), hooks).await?;
        }

        Ok(Ok(VisitOutcome::Completed {
            response: response.clone(),
        }))
    }

    /// Error-kind dispatch: the specific hook for the kind, then the `fail`
    /// catch-all. Never re-throws the protocol failure.
    async fn run_failure_hooks(
        &self,
        request: &RequestDescriptor,
        error: NavigationError,
    ) -> Result<VisitOutcome> {
        let hooks = &request.options.hooks;
        let error = Arc::new(error);

        match &*error {
            NavigationError::Cancelled | NavigationError::Aborted => {
                tracing::debug!(url = %request.url, kind = ?error.kind(), "visit did not complete");
                self.dispatch(HookPayload::Abort(Arc::clone(&error)), hooks).await?;
            }
            NavigationError::NotHybrid(response) => {
                tracing::warn!(
                    url = %response.url,
                    status = %response.status,
                    "response is not a hybrid response"
                );
                if self.config.error_overlay {
                    self.browser.show_error_overlay(response);
                }
                self.dispatch(HookPayload::Invalid((**response).clone()), hooks).await?;
            }
            NavigationError::Other(source) => {
                tracing::error!(url = %request.url, error = %source, "visit failed");
                self.dispatch(HookPayload::Exception(Arc::clone(&error)), hooks).await?;
            }
        }

        self.dispatch(HookPayload::Fail(Arc::clone(&error)), hooks).await?;

        Ok(VisitOutcome::Failed { error })
    }
}

//! Reverse-order teardown walk.

use std::collections::HashSet;
use tracing::{info, info_span, warn, Instrument};

use crate::adapters::{adapter_for, AdapterContext, DeleteOutcome};
use crate::config::{Document, ResourceDecl, ResourceType};
use crate::error::Result;

use super::result::{describe_failure, Operation, ResourceResult, RunAborted, RunReport};
use super::Engine;

impl Engine<'_> {
    /// Tears down every resource of `document` in reverse declared order.
    ///
    /// With a non-empty `tag_filter`, only resources declaring at least one
    /// of those tags are touched; the rest are recorded as skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RunAborted`] with the partial report when a fatal error
    /// stops the walk.
    pub async fn teardown(
        &self,
        document: &Document,
        tag_filter: &[String],
    ) -> std::result::Result<RunReport, RunAborted> {
        let mut report = RunReport::start(Operation::Teardown, document, self.options.dry_run);
        let span = info_span!(
            "teardown",
            run_id = %report.run_id,
            document = %document.name,
            dry_run = self.options.dry_run
        );

        async move {
            let tag = document.cleanup_tag(&self.options.tool_name);
            let ctx = AdapterContext::new(self.executor, self.options.workspace.as_deref(), &tag);
            let mut swept: HashSet<ResourceType> = HashSet::new();

            info!(
                "Tearing down {} resource(s) tagged {tag}",
                document.resources.len()
            );

            for decl in document.resources.iter().rev() {
                match self.teardown_one(&ctx, decl, tag_filter, &mut swept).await {
                    Ok(result) => {
                        info!(
                            "{} {} ({}): {}",
                            result.resource_type,
                            result.resource_name,
                            result.id_reference,
                            result.action
                        );
                        report.push(result);
                    }
                    Err(source) => {
                        warn!("Aborting run at {}: {source}", decl.id_reference);
                        report.push(ResourceResult::failed(decl, describe_failure(&source)));
                        report.finish();
                        return Err(RunAborted { report, source });
                    }
                }
            }

            report.finish();
            info!("Teardown finished: {}", report.summary());
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Handles one resource. `Err` is reserved for fatal errors.
    async fn teardown_one(
        &self,
        ctx: &AdapterContext<'_>,
        decl: &ResourceDecl,
        tag_filter: &[String],
        swept: &mut HashSet<ResourceType>,
    ) -> Result<ResourceResult> {
        if !tag_filter.is_empty() && !decl.matches_any_tag(tag_filter) {
            return Ok(ResourceResult::skipped(
                decl,
                None,
                format!("filtered out (no tag in {})", tag_filter.join(", ")),
            ));
        }

        if self.options.dry_run {
            return Ok(ResourceResult::skipped(decl, None, "dry run"));
        }

        let adapter = adapter_for(decl.resource_type);

        if adapter.bulk_delete() && swept.contains(&decl.resource_type) {
            return Ok(ResourceResult::skipped(decl, None, "already cleaned"));
        }

        let outcome = adapter.delete(ctx, &decl.name).await;
        if adapter.bulk_delete() && outcome.is_ok() {
            swept.insert(decl.resource_type);
        }

        let result = match outcome {
            Ok(DeleteOutcome::Deleted(id)) => ResourceResult::deleted(decl, id),
            Ok(DeleteOutcome::NotFound) => ResourceResult::skipped(decl, None, "not found"),
            Ok(DeleteOutcome::BulkDeleted(ids)) => {
                let note = format!(
                    "removed {} {} resource(s) tagged {}",
                    ids.len(),
                    decl.resource_type,
                    ctx.cleanup_tag()
                );
                match ids.into_iter().next() {
                    Some(first) => ResourceResult::deleted(decl, first).with_note(note),
                    None => ResourceResult::skipped(decl, None, "not found"),
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => ResourceResult::failed(decl, describe_failure(&e)),
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Action, RunOptions};
    use super::*;
    use crate::test_support::{chain_document, document, Reply, RecordingExecutor};
    use serde_json::json;

    const QUERY_LOCATIONS: &str = "/nilocation/v1/query-locations";
    const QUERY_SYSTEMS: &str = "/nisysmgmt/v1/query-systems";
    const QUERY_RESULTS: &str = "/nitestmonitor/v2/query-results";
    const DELETE_RESULTS: &str = "/nitestmonitor/v2/delete-results";

    fn order(report: &RunReport) -> Vec<&str> {
        report.results.iter().map(|r| r.id_reference.as_str()).collect()
    }

    fn results_document() -> Document {
        document(
            r#"
format_version: "1.0"
name: results
title: Results
resources:
  - type: test_result
    name: First
    id_reference: first
    properties: {}
  - type: location
    name: Lab
    id_reference: lab
    properties: {}
  - type: test_result
    name: Second
    id_reference: second
    properties: {}
"#,
        )
    }

    #[tokio::test]
    async fn test_reverse_order_all_missing() {
        let fake = RecordingExecutor::new();
        let engine = Engine::new(&fake, RunOptions::default());

        let report = engine.teardown(&chain_document(), &[]).await.unwrap();

        assert_eq!(order(&report), vec!["scope", "bench", "lab"]);
        assert!(report.results.iter().all(|r| r.action == Action::Skipped));
        assert!(report.results.iter().all(|r| r.server_id.is_none()));
        assert_eq!(report.operation, Operation::Teardown);
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_requests() {
        let fake = RecordingExecutor::new();
        let engine = Engine::new(&fake, RunOptions::default().with_dry_run(true));

        let report = engine.teardown(&chain_document(), &[]).await.unwrap();

        assert_eq!(report.results.len(), 3);
        assert!(report
            .results
            .iter()
            .all(|r| r.action == Action::Skipped && r.server_id.is_none()));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_tag_filter_skips_without_calling_adapter() {
        let fake = RecordingExecutor::new();
        fake.reply("POST", QUERY_LOCATIONS, Reply::Json(json!({ "locations": [{ "id": "loc-1" }] })));
        let engine = Engine::new(&fake, RunOptions::default());

        let report = engine
            .teardown(&chain_document(), &[String::from("site")])
            .await
            .unwrap();

        let actions: Vec<Action> = report.results.iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![Action::Skipped, Action::Skipped, Action::Deleted]);
        assert!(report.results[0].note.as_deref().unwrap().starts_with("filtered out"));
        assert!(fake.requests().iter().all(|r| r.path != QUERY_SYSTEMS));
    }

    #[tokio::test]
    async fn test_bulk_kind_is_swept_once() {
        let fake = RecordingExecutor::new();
        fake.reply(
            "POST",
            QUERY_RESULTS,
            Reply::Json(json!({ "results": [{ "id": "r-1" }, { "id": "r-2" }] })),
        );
        let engine = Engine::new(&fake, RunOptions::default());

        let report = engine.teardown(&results_document(), &[]).await.unwrap();

        assert_eq!(order(&report), vec!["second", "lab", "first"]);
        assert_eq!(report.results[0].action, Action::Deleted);
        assert_eq!(report.results[0].server_id.as_deref(), Some("r-1"));
        assert!(report.results[0].note.as_deref().unwrap().contains("removed 2"));
        assert_eq!(report.results[2].action, Action::Skipped);
        assert_eq!(report.results[2].note.as_deref(), Some("already cleaned"));
        assert_eq!(
            fake.requests().iter().filter(|r| r.path == DELETE_RESULTS).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_sweep_is_retried_by_next_resource() {
        let fake = RecordingExecutor::new();
        fake.reply("POST", QUERY_RESULTS, Reply::Status(500, json!({ "message": "busy" })));
        fake.reply("POST", QUERY_RESULTS, Reply::Json(json!({ "results": [] })));
        let engine = Engine::new(&fake, RunOptions::default());

        let report = engine.teardown(&results_document(), &[]).await.unwrap();

        assert_eq!(report.results[0].action, Action::Failed);
        assert!(report.results[0].error.as_deref().unwrap().contains("busy"));
        assert_eq!(report.results[2].action, Action::Skipped);
        assert_eq!(report.results[2].note.as_deref(), Some("not found"));
    }

    #[tokio::test]
    async fn test_unauthorized_aborts() {
        let fake = RecordingExecutor::new();
        fake.always("POST", QUERY_SYSTEMS, Reply::Unauthorized);
        let engine = Engine::new(&fake, RunOptions::default());

        let aborted = engine.teardown(&chain_document(), &[]).await.unwrap_err();

        assert_eq!(order(&aborted.report), vec!["scope", "bench"]);
        assert_eq!(aborted.report.results[1].action, Action::Failed);
        assert!(fake.requests().iter().all(|r| r.path != QUERY_LOCATIONS));
    }
}

//! Declared-order provisioning walk.

use serde_json::{Map, Value};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::adapters::{adapter_for, AdapterContext, CreateOutcome};
use crate::config::{Document, ResourceDecl};
use crate::error::Result;

use super::resolver::{collect_placeholders, resolve_map, IdMap};
use super::result::{describe_failure, Action, Operation, ResourceResult, RunAborted, RunReport};
use super::{Engine, LookupFailurePolicy};

impl Engine<'_> {
    /// Provisions every resource of `document` in declared order.
    ///
    /// Each resource is resolved against the identifiers published by the
    /// resources before it, looked up, and created only when absent.
    /// Per-resource errors become `Failed` results and the walk continues.
    ///
    /// # Errors
    ///
    /// Returns [`RunAborted`] with the partial report when a fatal error
    /// (such as rejected credentials) stops the walk.
    pub async fn provision(&self, document: &Document) -> std::result::Result<RunReport, RunAborted> {
        let mut report = RunReport::start(Operation::Provision, document, self.options.dry_run);
        let span = info_span!(
            "provision",
            run_id = %report.run_id,
            document = %document.name,
            dry_run = self.options.dry_run
        );

        async move {
            let tag = document.cleanup_tag(&self.options.tool_name);
            let ctx = AdapterContext::new(self.executor, self.options.workspace.as_deref(), &tag);
            let mut ids = IdMap::new();

            info!(
                "Provisioning {} resource(s) tagged {tag}",
                document.resources.len()
            );

            for decl in &document.resources {
                match self.provision_one(&ctx, decl, &ids).await {
                    Ok(result) => {
                        publish(&result, &mut ids);
                        log_result(&result);
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
            info!("Provisioning finished: {}", report.summary());
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Handles one resource. `Err` is reserved for fatal errors.
    async fn provision_one(
        &self,
        ctx: &AdapterContext<'_>,
        decl: &ResourceDecl,
        ids: &IdMap,
    ) -> Result<ResourceResult> {
        let properties = resolve_map(&decl.properties, ids);

        let unresolved = unresolved_references(&properties);
        if !unresolved.is_empty() {
            warn!(
                "{} still references {} (declared later or not provisioned)",
                decl.id_reference,
                unresolved.join(", ")
            );
            if self.options.strict_references {
                return Ok(ResourceResult::failed(
                    decl,
                    format!("Unresolved reference(s): {}", unresolved.join(", ")),
                ));
            }
        }

        if self.options.dry_run {
            debug!("Dry run payload for {}: {:?}", decl.id_reference, properties);
            return Ok(ResourceResult::skipped(decl, None, "dry run"));
        }

        let adapter = adapter_for(decl.resource_type);

        let existing = match adapter.find_by_name(ctx, &decl.name).await {
            Ok(found) => found,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => match self.options.lookup_failure {
                LookupFailurePolicy::Fail => {
                    return Ok(ResourceResult::failed(
                        decl,
                        format!("Existence check failed: {}", describe_failure(&e)),
                    ));
                }
                LookupFailurePolicy::TreatAsMissing => {
                    warn!(
                        "Existence check for {} failed, treating as missing: {e}",
                        decl.id_reference
                    );
                    None
                }
            },
        };

        if let Some(id) = existing {
            return Ok(ResourceResult::skipped(decl, Some(id), "already exists"));
        }

        debug!("Creating {} {}", decl.resource_type, decl.name);

        let result = match adapter.create(ctx, &decl.name, &properties).await {
            Ok(CreateOutcome::Created(id)) => ResourceResult::created(decl, id),
            Ok(CreateOutcome::DuplicateFound(id)) => {
                ResourceResult::skipped(decl, Some(id), "already exists (reported by service)")
            }
            Ok(CreateOutcome::DuplicateUnresolved) => ResourceResult::skipped(
                decl,
                None,
                "already exists (reported by service, identifier unknown)",
            ),
            Ok(CreateOutcome::Failed(reason)) => ResourceResult::failed(decl, reason),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => ResourceResult::failed(decl, describe_failure(&e)),
        };

        Ok(result)
    }
}

/// Publishes a result's identifier so later resources can reference it.
///
/// Skipped resources without a known identifier publish a synthetic one.
fn publish(result: &ResourceResult, ids: &mut IdMap) {
    match (result.action, &result.server_id) {
        (Action::Created | Action::Skipped, Some(id)) => ids.publish(&result.id_reference, id),
        (Action::Skipped, None) => ids.publish_synthetic(&result.id_reference),
        _ => {}
    }
}

fn unresolved_references(properties: &Map<String, Value>) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for reference in properties.values().flat_map(collect_placeholders) {
        if !found.contains(&reference) {
            found.push(reference);
        }
    }
    found
}

fn log_result(result: &ResourceResult) {
    match result.action {
        Action::Failed => warn!(
            "{} {} ({}): failed: {}",
            result.resource_type,
            result.resource_name,
            result.id_reference,
            result.error.as_deref().unwrap_or("unknown error")
        ),
        action => info!(
            "{} {} ({}): {action}{}",
            result.resource_type,
            result.resource_name,
            result.id_reference,
            result
                .server_id
                .as_deref()
                .map(|id| format!(" [{id}]"))
                .unwrap_or_default()
        ),
    }
}

//! Field-level change diff and the audit trail written after mutations.
//!
//! Snapshots are projected through serde into JSON objects and compared key
//! by key with structural equality, so nested values compare by content.
//! Every update writes exactly one event, including updates that changed
//! nothing. A failing sink is logged and swallowed: the mutation it
//! describes has already been committed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{LenderError, Result};
use crate::ports::AuditSink;
use crate::principal::Principal;

/// Old and new value of one changed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Changed fields keyed by their serialized name, in name order.
pub type FieldDiff = BTreeMap<String, FieldChange>;

/// Compare two snapshots of the same entity, skipping `ignored` field names.
pub fn diff_snapshots<T: Serialize>(before: &T, after: &T, ignored: &[&str]) -> Result<FieldDiff> {
    let before = to_object(before)?;
    let after = to_object(after)?;
    let ignored: BTreeSet<&str> = ignored.iter().copied().collect();

    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    let mut diff = FieldDiff::new();
    for key in keys {
        if ignored.contains(key.as_str()) {
            continue;
        }
        let old = before.get(key).cloned().unwrap_or(Value::Null);
        let new = after.get(key).cloned().unwrap_or(Value::Null);
        if old != new {
            diff.insert(key.clone(), FieldChange { old, new });
        }
    }
    Ok(diff)
}

fn to_object<T: Serialize>(value: &T) -> Result<serde_json::Map<String, Value>> {
    match serde_json::to_value(value).map_err(|e| LenderError::Internal(e.into()))? {
        Value::Object(map) => Ok(map),
        other => Err(LenderError::InvalidInput(format!(
            "audit snapshots must serialize to objects, got {}",
            kind(&other)
        ))),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn render(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Event row appended to `o_events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEvent {
    pub tbl: String,
    pub fld: i32,
    pub event_details: String,
    pub event_by: i32,
}

/// What happened to the record.
#[derive(Debug, Clone, Copy)]
pub enum Change<'a, T> {
    Update {
        before: &'a T,
        after: &'a T,
        ignored: &'a [&'a str],
    },
    Delete,
}

/// Where the event is filed and who caused it.
#[derive(Debug, Clone, Copy)]
pub struct ChangeContext<'a> {
    /// Table recorded on the event.
    pub table: &'a str,
    /// Human label of the changed entity, e.g. `Customer`.
    pub entity: &'a str,
    /// Id of the changed entity, shown in the message.
    pub primary_id: i32,
    /// Record id stored on the event.
    pub secondary_id: i32,
    pub actor: &'a Principal,
}

pub fn describe_update(ctx: &ChangeContext<'_>, diff: &FieldDiff) -> String {
    let head = format!(
        "{}({}) update triggered by [{}]",
        ctx.entity,
        ctx.primary_id,
        ctx.actor.audit_label()
    );
    if diff.is_empty() {
        return format!("{head}. No values were modified");
    }
    let changes: Vec<String> = diff
        .iter()
        .map(|(field, c)| {
            format!(
                "{field} changed from {} to {}",
                render(&c.old),
                render(&c.new)
            )
        })
        .collect();
    format!("{head}. Changes: {}", changes.join(", "))
}

pub fn describe_delete(ctx: &ChangeContext<'_>) -> String {
    format!(
        "Deletion of {}({}) triggered by {}({})(UID: {})",
        ctx.entity, ctx.primary_id, ctx.actor.name, ctx.actor.email, ctx.actor.uid
    )
}

#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Build and append one event. Returns the event whether or not the sink accepted it.
    pub async fn log_change<T: Serialize>(
        &self,
        change: Change<'_, T>,
        ctx: ChangeContext<'_>,
    ) -> NewAuditEvent {
        let event_details = match change {
            Change::Update {
                before,
                after,
                ignored,
            } => match diff_snapshots(before, after, ignored) {
                Ok(diff) => describe_update(&ctx, &diff),
                Err(e) => {
                    tracing::error!(
                        entity = ctx.entity,
                        primary_id = ctx.primary_id,
                        error = %e,
                        "audit diff failed"
                    );
                    format!(
                        "{}({}) update triggered by [{}]. Changes could not be computed",
                        ctx.entity,
                        ctx.primary_id,
                        ctx.actor.audit_label()
                    )
                }
            },
            Change::Delete => describe_delete(&ctx),
        };

        let event = NewAuditEvent {
            tbl: ctx.table.to_string(),
            fld: ctx.secondary_id,
            event_details,
            event_by: ctx.actor.uid,
        };

        match self.sink.append(&event).await {
            Ok(()) => tracing::debug!(tbl = %event.tbl, fld = event.fld, "audit event stored"),
            Err(e) => tracing::error!(
                tbl = %event.tbl,
                fld = event.fld,
                event_by = event.event_by,
                error = %e,
                "failed to store audit event"
            ),
        }
        event
    }

    pub async fn log_update<T: Serialize>(
        &self,
        before: &T,
        after: &T,
        ignored: &[&str],
        ctx: ChangeContext<'_>,
    ) -> NewAuditEvent {
        self.log_change(
            Change::Update {
                before,
                after,
                ignored,
            },
            ctx,
        )
        .await
    }

    pub async fn log_delete(&self, ctx: ChangeContext<'_>) -> NewAuditEvent {
        self.log_change(Change::<()>::Delete, ctx).await
    }
}

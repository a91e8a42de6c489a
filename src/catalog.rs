//! Canonical restore constants.
//!
//! The table order is a topological ordering of the live schema's foreign-key
//! graph: parents always precede children so that batched, non-transactional
//! replay keeps referential integrity violations to a minimum. Extending the
//! live table set or bucket set means extending these lists; the restore
//! logic itself never changes.

/// Fixed dependency-ordered table sequence for restore.
///
/// Grouped by domain: organization/permission roots, then profiles and
/// security, the document/folder graph, financial entities, calendar and
/// communication entities, tasks, and finally the leaf entities nothing
/// else references.
pub const CANONICAL_TABLE_ORDER: &[&str] = &[
    // Organization and permission roots
    "organizations",
    "organization_settings",
    "permission_groups",
    "permissions",
    "group_permissions",
    // Profiles, roles, security
    "profiles",
    "roles",
    "profile_roles",
    "security_settings",
    // Document / folder graph
    "folders",
    "documents",
    "document_versions",
    "document_shares",
    "document_comments",
    "folder_shares",
    // Financial / cost-center entities
    "cost_centers",
    "financial_accounts",
    "budgets",
    "invoices",
    "invoice_lines",
    "expenses",
    // Calendar / communication / meeting entities
    "calendars",
    "calendar_events",
    "event_attendees",
    "conversations",
    "messages",
    "message_attachments",
    "meetings",
    "meeting_participants",
    "meeting_notes",
    // Tasks
    "task_boards",
    "tasks",
    "task_assignments",
    "task_comments",
    // Leaf entities
    "insurance_policies",
    "insurance_claims",
    "notifications",
    "notification_preferences",
    "audit_log",
    "integration_tokens",
    "schedules",
    "schedule_entries",
];

/// Known live storage buckets. Manifest entries for any other bucket are
/// ignored during reconciliation.
pub const BUCKET_ALLOWLIST: &[&str] = &[
    "avatars",
    "documents",
    "attachments",
    "invoices",
    "recordings",
];

/// Declared foreign-key pairs `(parent, child)` of the live schema.
///
/// Used to validate that [`CANONICAL_TABLE_ORDER`] really is a topological
/// order; the restore path never consults this at runtime.
pub const FOREIGN_KEY_PAIRS: &[(&str, &str)] = &[
    ("organizations", "organization_settings"),
    ("organizations", "profiles"),
    ("organizations", "folders"),
    ("organizations", "cost_centers"),
    ("organizations", "audit_log"),
    ("permission_groups", "group_permissions"),
    ("permissions", "group_permissions"),
    ("profiles", "profile_roles"),
    ("roles", "profile_roles"),
    ("profiles", "security_settings"),
    ("folders", "documents"),
    ("profiles", "documents"),
    ("documents", "document_versions"),
    ("documents", "document_shares"),
    ("profiles", "document_shares"),
    ("documents", "document_comments"),
    ("folders", "folder_shares"),
    ("cost_centers", "budgets"),
    ("cost_centers", "expenses"),
    ("financial_accounts", "invoices"),
    ("invoices", "invoice_lines"),
    ("profiles", "calendars"),
    ("calendars", "calendar_events"),
    ("calendar_events", "event_attendees"),
    ("conversations", "messages"),
    ("messages", "message_attachments"),
    ("meetings", "meeting_participants"),
    ("meetings", "meeting_notes"),
    ("task_boards", "tasks"),
    ("tasks", "task_assignments"),
    ("profiles", "task_assignments"),
    ("tasks", "task_comments"),
    ("insurance_policies", "insurance_claims"),
    ("profiles", "notifications"),
    ("profiles", "notification_preferences"),
    ("profiles", "integration_tokens"),
    ("schedules", "schedule_entries"),
];

/// Canonical table order as owned strings, for configs built from defaults.
#[must_use]
pub fn canonical_table_order() -> Vec<String> {
    CANONICAL_TABLE_ORDER.iter().map(|s| s.to_string()).collect()
}

/// Bucket allow-list as owned strings.
#[must_use]
pub fn bucket_allowlist() -> Vec<String> {
    BUCKET_ALLOWLIST.iter().map(|s| s.to_string()).collect()
}

/// Declared foreign-key pairs as owned strings.
#[must_use]
pub fn foreign_key_pairs() -> Vec<(String, String)> {
    FOREIGN_KEY_PAIRS
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

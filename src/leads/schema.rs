//! SQLite schema definition

/// SQL schema for the lead store
pub const SCHEMA_SQL: &str = r#"
-- Leads: contact form submissions and their CRM lifecycle
CREATE TABLE IF NOT EXISTS leads (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    name TEXT NOT NULL,
    practice_name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT NOT NULL,
    website TEXT,
    project_type TEXT,

    status TEXT NOT NULL DEFAULT 'new'
        CHECK (status IN ('new', 'contacted', 'qualified', 'proposal_sent', 'won', 'lost')),
    status_history_json TEXT,
    notes TEXT,
    conversion_value REAL,
    converted_at TEXT,

    utm_source TEXT,
    utm_medium TEXT,
    utm_campaign TEXT,
    utm_term TEXT,
    utm_content TEXT,
    gclid TEXT,
    fbclid TEXT,
    msclkid TEXT,
    ttclid TEXT,
    li_fat_id TEXT,
    landing_page TEXT,
    referrer TEXT,
    user_agent TEXT,
    ip_address TEXT,

    gads_conversion_sent INTEGER NOT NULL DEFAULT 0,
    gads_conversion_sent_at TEXT,
    CHECK ((gads_conversion_sent = 0) = (gads_conversion_sent_at IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_leads_created_at ON leads(created_at);
CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status);
CREATE INDEX IF NOT EXISTS idx_leads_utm_source ON leads(utm_source);
CREATE INDEX IF NOT EXISTS idx_leads_gclid ON leads(gclid);
"#;

/// Columns the admin listing may sort by
pub const SORTABLE_COLUMNS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "name",
    "practice_name",
    "email",
    "phone",
    "website",
    "project_type",
    "status",
    "notes",
    "conversion_value",
    "converted_at",
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "msclkid",
    "ttclid",
    "li_fat_id",
    "landing_page",
    "referrer",
    "user_agent",
    "ip_address",
    "gads_conversion_sent",
    "gads_conversion_sent_at",
];

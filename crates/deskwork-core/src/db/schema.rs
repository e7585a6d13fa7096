//! Canonical SQLite schema for deskwork.
//!
//! - `tickets` holds the latest fields of each ticket
//! - `ticket_assignees` is the cached, ordered assignee list of a ticket
//! - `assignments` is the source of truth for who works a ticket; rows are
//!   cancelled, never deleted
//! - `users`/`user_roles` back actor resolution and display names
//! - `customers`/`customer_alerts` hold customer master data
//! - `teams`/`products` hold the support catalogue tickets are routed by
//! - `store_meta` tracks the schema version alongside `PRAGMA user_version`

/// Migration v1: users, tickets, assignments, comments.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY CHECK (length(trim(user_id)) > 0),
    full_name TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (length(trim(role)) > 0),
    PRIMARY KEY (user_id, role)
);

CREATE TABLE IF NOT EXISTS tickets (
    ticket_id TEXT PRIMARY KEY CHECK (length(trim(ticket_id)) > 0),
    subject TEXT NOT NULL,
    status TEXT NOT NULL,
    priority TEXT,
    team TEXT,
    customer TEXT,
    customer_code TEXT,
    product TEXT,
    phone TEXT,
    start_time_us INTEGER,
    closed_at_us INTEGER,
    latitude REAL,
    longitude REAL,
    location_geojson TEXT,
    location_text TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ticket_assignees (
    ticket_id TEXT NOT NULL REFERENCES tickets(ticket_id) ON DELETE CASCADE,
    user_id TEXT NOT NULL CHECK (length(trim(user_id)) > 0),
    position INTEGER NOT NULL,
    PRIMARY KEY (ticket_id, user_id)
);

CREATE TABLE IF NOT EXISTS assignments (
    assignment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference TEXT NOT NULL REFERENCES tickets(ticket_id) ON DELETE CASCADE,
    assigned_to TEXT NOT NULL CHECK (length(trim(assigned_to)) > 0),
    status TEXT NOT NULL CHECK (status IN ('Open', 'Cancelled')),
    description TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ticket_comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id TEXT NOT NULL REFERENCES tickets(ticket_id) ON DELETE CASCADE,
    author TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);

CREATE INDEX IF NOT EXISTS idx_assignments_reference_status
    ON assignments(reference, status, created_at_us DESC, assignment_id DESC);

CREATE INDEX IF NOT EXISTS idx_tickets_status_created
    ON tickets(status, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_ticket_comments_ticket_created
    ON ticket_comments(ticket_id, created_at_us DESC);
";

/// Migration v2: customers and customer alerts.
pub const MIGRATION_V2_SQL: &str = r"
CREATE TABLE IF NOT EXISTS customers (
    name TEXT PRIMARY KEY CHECK (length(trim(name)) > 0),
    customer_name TEXT NOT NULL,
    customer_code TEXT,
    sl_no TEXT,
    product_name TEXT,
    address1 TEXT,
    address2 TEXT,
    place TEXT,
    district TEXT,
    state TEXT,
    country TEXT,
    contact_person TEXT,
    phone1 TEXT,
    phone2 TEXT,
    gst_no TEXT,
    email TEXT,
    license_count INTEGER,
    amc_last_paid TEXT,
    modified_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS customer_alerts (
    customer TEXT PRIMARY KEY CHECK (length(trim(customer)) > 0),
    remarks TEXT NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tickets_customer
    ON tickets(customer);

CREATE INDEX IF NOT EXISTS idx_customers_modified
    ON customers(modified_at_us DESC);
";

/// Migration v3: support teams and the products they look after.
pub const MIGRATION_V3_SQL: &str = r"
CREATE TABLE IF NOT EXISTS teams (
    name TEXT PRIMARY KEY CHECK (length(trim(name)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    name TEXT PRIMARY KEY CHECK (length(trim(name)) > 0),
    description TEXT,
    team TEXT REFERENCES teams(name) ON DELETE SET NULL,
    modified_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_team
    ON products(team);
";

/// Indexes the read paths depend on.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_assignments_reference_status",
    "idx_tickets_status_created",
    "idx_ticket_comments_ticket_created",
    "idx_tickets_customer",
    "idx_customers_modified",
    "idx_products_team",
];

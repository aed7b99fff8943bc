pub const CREATE_ALERTS: &str = r#"
CREATE TABLE IF NOT EXISTS alerts (
    alert_id     TEXT PRIMARY KEY,
    category     TEXT NOT NULL,
    severity     TEXT NOT NULL,
    title        TEXT NOT NULL,
    description  TEXT NOT NULL,
    lat          DOUBLE PRECISION,
    lng          DOUBLE PRECISION,
    created_at   TIMESTAMPTZ NOT NULL,
    suppressed   BOOLEAN,
    attempted    INTEGER,
    delivered    INTEGER,
    failed       INTEGER,
    outcome      JSONB,
    finalized_at TIMESTAMPTZ
);
"#;

pub const CREATE_RECIPIENTS: &str = r#"
CREATE TABLE IF NOT EXISTS recipients (
    recipient_id  TEXT PRIMARY KEY,
    lat           DOUBLE PRECISION,
    lng           DOUBLE PRECISION,
    phone         TEXT,
    email         TEXT,
    sms_enabled   BOOLEAN NOT NULL DEFAULT TRUE,
    email_enabled BOOLEAN NOT NULL DEFAULT TRUE
);
"#;

pub const CREATE_RECIPIENTS_GEO_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS recipients_lat_lng_idx ON recipients (lat, lng);
"#;

pub const CREATE_SUPPRESSION_WINDOWS: &str = r#"
CREATE TABLE IF NOT EXISTS suppression_windows (
    window_id  UUID PRIMARY KEY,
    lat        DOUBLE PRECISION NOT NULL,
    lng        DOUBLE PRECISION NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL
);
"#;

pub const CREATE_SUPPRESSION_WINDOWS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS suppression_windows_created_at_idx ON suppression_windows (created_at);
"#;

pub const SELECT_RECIPIENTS_IN_BOX: &str = r#"
SELECT recipient_id, lat, lng, phone, email, sms_enabled, email_enabled
FROM recipients
WHERE lat IS NOT NULL
  AND lng IS NOT NULL
  AND lat BETWEEN $1 AND $2
  AND lng BETWEEN $3 AND $4
  AND (sms_enabled OR email_enabled);
"#;

pub const INSERT_SUPPRESSION_WINDOW: &str = r#"
INSERT INTO suppression_windows (window_id, lat, lng, created_at, expires_at)
VALUES ($1, $2, $3, $4, $5);
"#;

pub const SELECT_SUPPRESSION_WINDOWS_SINCE: &str = r#"
SELECT window_id, lat, lng, created_at, expires_at
FROM suppression_windows
WHERE created_at > $1;
"#;

pub const DELETE_EXPIRED_SUPPRESSION_WINDOWS: &str = r#"
DELETE FROM suppression_windows WHERE expires_at <= $1;
"#;

pub const INSERT_ALERT: &str = r#"
INSERT INTO alerts (alert_id, category, severity, title, description, lat, lng, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (alert_id) DO NOTHING;
"#;

pub const UPDATE_ALERT_OUTCOME: &str = r#"
UPDATE alerts
SET suppressed = $2,
    attempted = $3,
    delivered = $4,
    failed = $5,
    outcome = $6,
    finalized_at = NOW()
WHERE alert_id = $1
  AND outcome IS NULL;
"#;
